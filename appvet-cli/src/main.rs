//! Command line interface for the appvet certification engine.

use appvet::app::{ConfigFile, ConfigParser};
use appvet::checks::default_registry;
use appvet::core::{CheckFilter, GroupRegistry};
use appvet::engine::{DotProgress, Validator, DEFAULT_WORKERS};
use appvet::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, ReportFormatter,
};
use appvet::logging::{init_logging, LoggingConfig};
use appvet::report::{CheckState, ValidationReport, MAX_MESSAGES_PER_CHECK};
use appvet::version::CertVersion;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "appvet",
    version,
    about = "Validates application artifacts against certification checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity for diagnostics on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Error)]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Command {
    /// Validates one or more unpacked artifact directories.
    Inspect(InspectArgs),
    /// Lists the registered checks, groups, or tags.
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Paths to unpacked artifact directories.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Run only checks carrying at least one of these tags.
    #[arg(long = "included-tags", value_delimiter = ',')]
    included_tags: Vec<String>,

    /// Skip checks carrying any of these tags. A tag that is also included
    /// counts as included.
    #[arg(long = "excluded-tags", value_delimiter = ',')]
    excluded_tags: Vec<String>,

    /// Run only checks applicable to this certification version.
    #[arg(long = "target-version")]
    target_version: Option<CertVersion>,

    /// Output mode: `test` prints one character per check, `precert` prints
    /// the full report.
    #[arg(long, value_enum, default_value_t = Mode::Test)]
    mode: Mode,

    /// Format of the report written to stdout or the output file.
    #[arg(long = "data-format", value_enum, default_value_t = DataFormat::Json)]
    data_format: DataFormat,

    /// Writes the report to a file instead of stdout.
    #[arg(long = "output-file")]
    output_file: Option<PathBuf>,

    /// Maximum messages reported per check before truncation, or `all`.
    #[arg(
        long = "max-messages",
        value_name = "N|all",
        value_parser = parse_max_messages,
        default_value_t = MAX_MESSAGES_PER_CHECK
    )]
    max_messages: usize,

    /// Worker pool width for concurrent check execution.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

#[derive(Subcommand)]
enum ListTarget {
    /// Lists every registered check with its group and tags.
    Checks {
        /// Restrict the listing to checks carrying one of these tags.
        #[arg(long = "included-tags", value_delimiter = ',')]
        included_tags: Vec<String>,
    },
    /// Lists the registered groups.
    Groups,
    /// Lists every tag in use.
    Tags,
    /// Prints the engine version.
    Version,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Test,
    Precert,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DataFormat {
    Json,
    Human,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn parse_max_messages(value: &str) -> Result<usize, String> {
    if value == "all" {
        return Ok(usize::MAX);
    }
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!(
            "\"{value}\" is not valid; only positive integers or \"all\" are accepted"
        )),
    }
}

/// Line-oriented `[section]` / `key = value` parser for artifact conf files.
struct ConfParser;

impl ConfigParser for ConfParser {
    fn parse(&self, name: &str, text: &str) -> appvet::error::Result<ConfigFile> {
        let mut config = ConfigFile::new(name);
        let mut section = String::from("default");
        for (idx, raw) in text.lines().enumerate() {
            let lineno = (idx + 1) as u64;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = header.to_string();
                config.add_section(&section, lineno);
            } else if let Some((key, value)) = line.split_once('=') {
                config.set_option(&section, key.trim(), value.trim(), lineno);
            }
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level: Level = cli.log_level.into();
    if let Err(err) = init_logging(
        LoggingConfig::default()
            .with_level(level)
            .with_engine_level(level),
    ) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::from(2);
    }

    match cli.command {
        Command::Inspect(args) => inspect(args).await,
        Command::List { target } => {
            list(default_registry(), target);
            ExitCode::SUCCESS
        }
    }
}

async fn inspect(args: InspectArgs) -> ExitCode {
    let mut filter = CheckFilter::new()
        .include_tags(args.included_tags.iter().cloned())
        .exclude_tags(args.excluded_tags.iter().cloned());
    if let Some(version) = args.target_version.clone() {
        filter = filter.target_version(version);
    }

    let mut builder = Validator::builder(default_registry())
        .filter(filter)
        .workers(args.workers)
        .config_parser(Arc::new(ConfParser));
    if args.mode == Mode::Test {
        // Manual verdicts stay silent in test mode unless their tag was
        // asked for explicitly.
        let skip_manual = !manual_included(&args.included_tags);
        builder = builder.hook(Arc::new(DotProgress::new(skip_manual)));
    }
    let validator = builder.build();

    let report = validator.validate(&args.paths).await;
    if let Err(err) = write_report(&report, &args) {
        eprintln!("failed to write report: {err}");
        return ExitCode::from(2);
    }

    // Exit codes, worst first: 3 unreadable or invalid package, 2 run error,
    // 1 error-severity finding, 0 clean.
    ExitCode::from(report.exit_code() as u8)
}

fn manual_included(included_tags: &[String]) -> bool {
    included_tags.iter().any(|tag| tag == "manual")
}

/// Record kinds the terminal report shows in test mode.
fn test_mode_states(included_tags: &[String]) -> Vec<CheckState> {
    let mut states = vec![CheckState::Error, CheckState::Failure];
    if manual_included(included_tags) {
        states.push(CheckState::ManualCheck);
    }
    states
}

fn write_report(report: &ValidationReport, args: &InspectArgs) -> appvet::error::Result<()> {
    let to_file = args.output_file.is_some();
    let mut config = FormatterConfig::default()
        .with_max_messages(args.max_messages)
        .with_colors(!to_file && args.data_format == DataFormat::Human);
    if args.mode == Mode::Test && args.data_format == DataFormat::Human {
        config = config.with_states(test_mode_states(&args.included_tags));
    }

    let rendered = match args.data_format {
        DataFormat::Json => JsonFormatter::with_config(config).format(report)?,
        DataFormat::Human => HumanFormatter::with_config(config).format(report)?,
    };

    match &args.output_file {
        Some(path) => std::fs::write(path, rendered)?,
        None => {
            // Test mode already streamed progress; the report goes to stdout
            // either way.
            println!("{rendered}");
        }
    }
    Ok(())
}

fn list(registry: GroupRegistry, target: ListTarget) {
    match target {
        ListTarget::Checks { included_tags } => {
            let filter = CheckFilter::new().include_tags(included_tags);
            for group in registry.groups(&filter) {
                println!("{}", group.name());
                for check in group.checks(&filter) {
                    println!("  {} [{}]", check.name(), check.tags().join(", "));
                    // doc() falls back to the name when undocumented.
                    if check.doc() != check.name() {
                        println!("      {}", check.doc());
                    }
                }
            }
        }
        ListTarget::Groups => {
            let everything = CheckFilter::new();
            for group in registry.all_groups() {
                println!(
                    "{} ({} checks: {} static, {} dynamic)",
                    group.name(),
                    group.check_count(&everything),
                    group.count_static_checks(&everything),
                    group.count_dynamic_checks(&everything)
                );
            }
        }
        ListTarget::Tags => {
            for tag in registry.tags() {
                println!("{tag}");
            }
        }
        ListTarget::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_messages_accepts_positive_integers_and_all() {
        assert_eq!(parse_max_messages("10"), Ok(10));
        assert_eq!(parse_max_messages("all"), Ok(usize::MAX));
        assert!(parse_max_messages("0").is_err());
        assert!(parse_max_messages("-3").is_err());
        assert!(parse_max_messages("everything").is_err());
    }

    #[test]
    fn test_test_mode_shows_manual_only_when_tagged_in() {
        let plain = test_mode_states(&["cloud".to_string()]);
        assert_eq!(plain, vec![CheckState::Error, CheckState::Failure]);

        let with_manual = test_mode_states(&["cloud".to_string(), "manual".to_string()]);
        assert!(with_manual.contains(&CheckState::ManualCheck));
    }

    #[test]
    fn test_conf_parser_reads_sections_options_and_lines() {
        let text = "# artifact declaration\n[launcher]\nversion = 2.1.0\nauthor=Example Corp\n\n[ui]\nlabel = Example App\n";
        let config = ConfParser.parse("app", text).unwrap();
        assert_eq!(config.option_value("launcher", "version").unwrap(), "2.1.0");
        assert_eq!(config.option_value("launcher", "author").unwrap(), "Example Corp");
        assert_eq!(config.option_value("ui", "label").unwrap(), "Example App");
        let option = config.section("ui").unwrap().option("label").unwrap();
        assert_eq!(option.lineno, 7);
    }
}
