#![forbid(unsafe_code)]

mod cmd;
mod output;
mod source;

use anyhow::Result;
use bulto_core::config::{self, ProjectConfig};
use bulto_core::timing;
use clap::{CommandFactory, Parser, Subcommand};
use cmd::Ctx;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bulto: parcel shipment timelines",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format (defaults to pretty on a terminal, text otherwise).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Status policy TOML (overrides `.bulto/config.toml`).
    #[arg(long, global = true, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Display zone for day bands and times: `local`, `utc` or `+HH:MM`.
    #[arg(long, global = true, value_name = "ZONE", allow_hyphen_values = true)]
    tz_offset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn format_flag(&self) -> Option<&'static str> {
        if self.json {
            return Some("json");
        }
        self.format.map(OutputMode::as_str)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show a shipment timeline",
        long_about = "Group shipment and package events under the status they follow, most recent first.",
        after_help = "EXAMPLES:\n    # Shipment-level timeline\n    bulto timeline shipment.json\n\n    # One package, every group expanded\n    bulto timeline shipment.json --package IT-1 --expand-all\n\n    # Emit machine-readable output\n    bulto timeline shipment.json --format json"
    )]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(
        next_help_heading = "Read",
        about = "List packages of a shipment",
        long_about = "List every package with its latest status and allowed actions.",
        after_help = "EXAMPLES:\n    # Package table\n    bulto packages shipment.json\n\n    # Tab-separated rows\n    bulto packages shipment.json --format text"
    )]
    Packages(cmd::packages::PackagesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show an item status record",
        long_about = "Show the current status, history, transition errors and audit trail of one item.",
        after_help = "EXAMPLES:\n    # Item status from a file\n    bulto item item.json\n\n    # From stdin\n    cat item.json | bulto item -"
    )]
    Item(cmd::item::ItemArgs),

    #[command(
        next_help_heading = "Read",
        about = "Look up many tracking numbers",
        long_about = "Resolve a list of tracking numbers against a snapshot directory. Results keep input order.",
        after_help = "EXAMPLES:\n    # Identifiers as arguments\n    bulto search --source ./snapshots T1 T2 T3\n\n    # Identifiers from a file (whitespace, comma or semicolon separated)\n    bulto search --source ./snapshots < ids.txt"
    )]
    Search(cmd::search::SearchArgs),

    #[command(
        next_help_heading = "Policy",
        about = "Check which actions a status allows",
        long_about = "Resolve cancellable, deliverable and assignable for one or more status codes.",
        after_help = "EXAMPLES:\n    # Two codes against the effective policy\n    bulto eligibility 2100 2500\n\n    # Against a custom policy\n    bulto --policy ops.toml eligibility 2100"
    )]
    Eligibility(cmd::eligibility::EligibilityArgs),

    #[command(
        next_help_heading = "Policy",
        about = "Show or check the status policy",
        long_about = "Print the effective status policy, or validate a policy file with `policy check`.",
        after_help = "EXAMPLES:\n    # Effective policy\n    bulto policy\n\n    # Validate a file\n    bulto policy check ops.toml"
    )]
    Policy(cmd::policy::PolicyArgs),

    #[command(
        next_help_heading = "Actions",
        about = "Validate a mutating action (dry run)",
        long_about = "Run an action through the status policy gate and print the request that would be sent.",
        after_help = "EXAMPLES:\n    # Cancel the latest status of a package\n    bulto action cancel --snapshot shipment.json --item IT-1 --reason \"wrong scan\"\n\n    # Deliver to a pick-up point\n    bulto action deliver --snapshot shipment.json --pudo"
    )]
    Action(cmd::action::ActionArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash completions\n    bulto completions bash > ~/.local/share/bash-completion/completions/bulto"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BULTO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "bulto=debug,bulto_core=debug,info"
        } else {
            "bulto=info,bulto_core=info,warn"
        })
    });

    let format = env::var("BULTO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Resolve everything a data command needs.
fn build_ctx(cli: &Cli, output: OutputMode, root: &Path, project: &ProjectConfig) -> Result<Ctx> {
    let policy = config::resolve_policy(root, project, cli.policy.as_deref())?;
    let zone = config::resolve_zone(project, cli.tz_offset.as_deref())?;
    debug!(%zone, "context resolved");
    Ok(Ctx {
        output,
        zone,
        policy,
        search: project.search.clone(),
    })
}

fn run(cli: &Cli, output: OutputMode) -> Result<()> {
    let root = env::current_dir()?;
    let project = config::load_project_config(&root)?;
    let ctx = || build_ctx(cli, output, &root, &project);

    match &cli.command {
        Commands::Timeline(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.timeline", || cmd::timeline::run_timeline(args, &ctx))
        }
        Commands::Packages(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.packages", || cmd::packages::run_packages(args, &ctx))
        }
        Commands::Item(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.item", || cmd::item::run_item(args, &ctx))
        }
        Commands::Search(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.search", || cmd::search::run_search(args, &ctx))
        }
        Commands::Eligibility(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.eligibility", || {
                cmd::eligibility::run_eligibility(args, &ctx)
            })
        }
        Commands::Policy(args) => match &args.command {
            Some(cmd::policy::PolicyCommand::Check { file }) => {
                timing::timed("cmd.policy.check", || cmd::policy::run_check(file, output))
            }
            None => {
                let ctx = ctx()?;
                timing::timed("cmd.policy", || cmd::policy::run_show(&ctx))
            }
        },
        Commands::Action(args) => {
            let ctx = ctx()?;
            timing::timed("cmd.action", || cmd::action::run_action(args, &ctx))
        }
        Commands::Completions(args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
    }
}

fn emit_timing_report() -> Result<()> {
    let report = timing::take_report();
    if report.is_empty() {
        eprintln!("timing report: no samples recorded");
    } else {
        eprintln!("timing report:");
        eprintln!("{}", report.render_table());
        eprintln!("timing report (json):");
        eprintln!("{}", serde_json::to_string_pretty(&report.to_json())?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::enabled_from_env();
    timing::set_enabled(timing_enabled);
    timing::clear();

    let user = config::load_user_config().unwrap_or_else(|e| {
        warn!("ignoring user config: {e:#}");
        config::UserConfig::default()
    });
    let output = OutputMode::from_name(&config::resolve_output(cli.format_flag(), &user));

    let result = run(&cli, output);

    if timing_enabled {
        emit_timing_report().unwrap_or_else(|e| warn!("timing report failed: {e:#}"));
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cli_error = CliError::from(&err);
            if render_error(output, &cli_error).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["bulto", "--timing", "policy"]);
        assert!(cli.timing);
        assert!(matches!(cli.command, Commands::Policy(_)));
    }

    #[test]
    fn timing_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["bulto", "packages", "s.json", "--timing"]);
        assert!(cli.timing);
    }

    #[test]
    fn json_flag_wins_over_format() {
        let cli = Cli::parse_from(["bulto", "--format", "text", "--json", "policy"]);
        assert_eq!(cli.format_flag(), Some("json"));
    }

    #[test]
    fn format_flag_after_subcommand() {
        let cli = Cli::parse_from(["bulto", "eligibility", "2100", "--format", "text"]);
        assert_eq!(cli.format_flag(), Some("text"));
    }

    #[test]
    fn no_format_flag_defers_to_config() {
        let cli = Cli::parse_from(["bulto", "policy"]);
        assert_eq!(cli.format_flag(), None);
    }

    #[test]
    fn negative_offset_parses_as_value() {
        let cli = Cli::parse_from(["bulto", "--tz-offset", "-05:00", "policy"]);
        assert_eq!(cli.tz_offset.as_deref(), Some("-05:00"));
    }

    #[test]
    fn timeline_expand_is_repeatable() {
        let cli = Cli::parse_from([
            "bulto", "timeline", "s.json", "--expand", "0", "--expand", "2",
        ]);
        let Commands::Timeline(args) = cli.command else {
            panic!("expected timeline");
        };
        assert_eq!(args.expand, [0, 2]);
    }

    #[test]
    fn action_subcommands_parse() {
        let cli = Cli::parse_from([
            "bulto", "action", "cancel", "--snapshot", "s.json", "--item", "IT-1", "--reason", "x",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Action(cmd::action::ActionArgs {
                command: cmd::action::ActionCommand::Cancel { .. }
            })
        ));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["bulto", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["bulto", "timeline", "s.json"],
            vec!["bulto", "packages", "s.json"],
            vec!["bulto", "item", "i.json"],
            vec!["bulto", "search", "--source", "d", "T1"],
            vec!["bulto", "eligibility", "2100"],
            vec!["bulto", "policy"],
            vec!["bulto", "policy", "check", "p.toml"],
            vec!["bulto", "action", "force", "--item", "IT-1", "--to", "2500"],
            vec!["bulto", "action", "event", "e.json"],
            vec!["bulto", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn eligibility_requires_a_code() {
        assert!(Cli::try_parse_from(["bulto", "eligibility"]).is_err());
    }
}
