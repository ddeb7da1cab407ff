//! Run lifecycle notifications.
//!
//! The engine emits a [`ValidationEvent`] at each lifecycle edge; hooks are
//! how callers observe progress without polling. Events fire from worker
//! tasks too, so implementations must tolerate concurrent delivery.

use crate::report::CheckState;
use std::io::Write;

/// Execution phase within one artifact's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Packaging-tagged checks, run ahead of everything else.
    Packaging,
    /// The remaining selected checks.
    Validation,
}

/// One lifecycle edge during a validation run.
#[derive(Debug, Clone)]
pub enum ValidationEvent {
    /// The run started; `artifact_count` artifacts will be validated.
    RunStarted { artifact_count: usize },
    /// Validation of one artifact started.
    ArtifactStarted { app_name: String },
    /// One execution phase of an artifact's run started.
    PhaseStarted { app_name: String, phase: RunPhase },
    /// One execution phase of an artifact's run finished.
    PhaseCompleted { app_name: String, phase: RunPhase },
    /// The packaging gate rejected the artifact; remaining checks will be
    /// recorded as skipped.
    PackagingGateFailed { app_name: String },
    /// The first check of a group was submitted.
    GroupStarted {
        app_name: String,
        group_name: String,
    },
    /// The last check of a group finished.
    GroupCompleted {
        app_name: String,
        group_name: String,
    },
    /// One check was picked up by a worker.
    CheckStarted {
        app_name: String,
        group_name: String,
        check_name: String,
    },
    /// One check finished with the given verdict.
    CheckCompleted {
        app_name: String,
        group_name: String,
        check_name: String,
        state: CheckState,
    },
    /// Validation of one artifact finished.
    ArtifactCompleted { app_name: String },
    /// The run finished.
    RunCompleted,
}

/// Observer of validation lifecycle events.
pub trait ValidationHooks: Send + Sync {
    /// Called at every lifecycle edge.
    fn on_event(&self, event: &ValidationEvent);
}

/// Prints one character per completed check, the way long terminal runs
/// show liveness: `.` success, `F` failure, `E` error, `S` skipped,
/// `W` warning, `M` manual, `N` not applicable.
#[derive(Debug, Default)]
pub struct DotProgress {
    skip_manual: bool,
}

impl DotProgress {
    /// Creates the hook. With `skip_manual` set, manual-review verdicts
    /// print no glyph at all.
    pub fn new(skip_manual: bool) -> Self {
        Self { skip_manual }
    }

    fn glyph(state: CheckState) -> char {
        match state {
            CheckState::Success => '.',
            CheckState::Failure => 'F',
            CheckState::Error => 'E',
            CheckState::Skipped => 'S',
            CheckState::Warning => 'W',
            CheckState::ManualCheck => 'M',
            CheckState::NotApplicable => 'N',
        }
    }
}

impl ValidationHooks for DotProgress {
    fn on_event(&self, event: &ValidationEvent) {
        let mut out = std::io::stderr().lock();
        let _ = match event {
            ValidationEvent::CheckCompleted { state, .. } => {
                if self.skip_manual && *state == CheckState::ManualCheck {
                    return;
                }
                write!(out, "{}", Self::glyph(*state)).and_then(|_| out.flush())
            }
            ValidationEvent::ArtifactCompleted { .. } | ValidationEvent::RunCompleted => {
                writeln!(out)
            }
            _ => Ok(()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_glyphs_are_distinct() {
        let glyphs: Vec<char> = CheckState::ALL.iter().map(|s| DotProgress::glyph(*s)).collect();
        let mut deduped = glyphs.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(glyphs.len(), deduped.len());
    }
}
