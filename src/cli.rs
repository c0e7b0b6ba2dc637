use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::migrate::config::ConfigOverrides;

// Needs $BORG_REPO, $BORG_PASSPHRASE, $RESTIC_REPOSITORY and $RESTIC_PASSWORD
// in the environment (or a .env file). `--set-path` needs a restic build
// that supports it.
#[derive(Parser)]
#[command(
    name = "borg2restic",
    version,
    about = "A tool to help convert a borg repository to restic"
)]
struct Cli {
    /// Print the final report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    migrate: MigrateArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Replay every matching borg archive as a restic snapshot (default)
    Migrate(MigrateArgs),
    /// Show the restic invocations a migration would run
    Plan(MigrateArgs),
    /// Check binaries, repository variables and configuration
    Status(MigrateArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
struct MigrateArgs {
    /// Archive prefix to filter against
    #[arg(long)]
    archive_prefix: Option<String>,
    /// Path inside each archive to cd into before starting backup
    #[arg(long)]
    sub_path: Option<PathBuf>,
    /// Hostname to set for all matching archives. Keep unset to use real hostname
    #[arg(long)]
    hostname: Option<String>,
    /// Optionally override path (via restic --set-path)
    #[arg(long)]
    set_path: Option<String>,
    /// IANA zone for archive times recorded without an offset (default: local)
    #[arg(long)]
    timezone: Option<String>,
    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
    /// Append JSON audit events to this file
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

impl From<&MigrateArgs> for ConfigOverrides {
    fn from(args: &MigrateArgs) -> Self {
        Self {
            archive_prefix: args.archive_prefix.clone(),
            sub_path: args.sub_path.clone(),
            hostname: args.hostname.clone(),
            set_path: args.set_path.clone(),
            timezone: args.timezone.clone(),
            no_progress: args.no_progress,
            audit_log: args.audit_log.clone(),
        }
    }
}

fn render_text(report: &CommandReport) -> String {
    let mut out = format!(
        "{}: {}\n",
        report.command,
        if report.ok { "ok" } else { "failed" }
    );
    for detail in &report.details {
        out.push_str(&format!("  - {detail}\n"));
    }
    for issue in &report.issues {
        out.push_str(&format!("  ! {issue}\n"));
    }
    out
}

fn emit(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }

    if !report.ok {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}

// Top-level migrate flags only apply to the bare (migrate) form; `--json`
// is global and may sit on either side of the subcommand.
fn check_flag_placement(cli: &Cli) -> Result<()> {
    if cli.command.is_some() && cli.migrate != MigrateArgs::default() {
        anyhow::bail!("migration flags must follow the subcommand");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    check_flag_placement(&cli)?;

    let report = match &cli.command {
        None => commands::migrate::run(&ConfigOverrides::from(&cli.migrate))?,
        Some(Command::Migrate(args)) => commands::migrate::run(&ConfigOverrides::from(args))?,
        Some(Command::Plan(args)) => commands::plan::run(&ConfigOverrides::from(args))?,
        Some(Command::Status(args)) => commands::status::run(&ConfigOverrides::from(args))?,
    };

    emit(&report, cli.json)
}
