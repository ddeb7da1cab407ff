//! Run orchestration: the validator, its worker pool, and lifecycle hooks.

mod hooks;
mod validator;

pub use hooks::{DotProgress, RunPhase, ValidationEvent, ValidationHooks};
pub use validator::{
    Validator, ValidatorBuilder, DEFAULT_WORKERS, PACKAGING_GATE_SKIP_MESSAGE,
    PACKAGING_STANDARDS_TAG,
};
