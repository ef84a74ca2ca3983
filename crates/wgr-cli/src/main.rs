use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wgr")]
#[command(about = "Wager ledger operator CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Falls back to WGR_CONFIG, then defaults.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Ledger inspection and maintenance
    Ledger {
        #[command(subcommand)]
        cmd: LedgerCmd,
    },

    /// Journal utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum LedgerCmd {
    /// Print pending / settled / deficit counts and the rolling net
    Summary,

    /// Remove legacy pending records that cannot be paired into a game.
    /// Without --yes, only reports what would be removed.
    CleanupOrphans {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Settle a game by id
    Settle {
        #[arg(long)]
        game_id: String,

        /// Winning team name
        #[arg(long)]
        winner: String,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the journal hash chain
    Verify {
        #[arg(long)]
        path: String,
    },

    /// List journaled operations with an INTENT but no COMMIT
    Uncommitted {
        #[arg(long)]
        path: String,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => commands::config_hash(&paths),

        Commands::Ledger { cmd } => {
            let ledger = commands::open_ledger(&cli.config_paths)?;
            match cmd {
                LedgerCmd::Summary => commands::ledger::summary(&ledger),
                LedgerCmd::CleanupOrphans { yes } => commands::ledger::cleanup_orphans(&ledger, yes),
                LedgerCmd::Settle { game_id, winner } => {
                    commands::ledger::settle(&ledger, &game_id, &winner)
                }
            }
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => commands::audit::verify(&path),
            AuditCmd::Uncommitted { path } => commands::audit::uncommitted(&path),
        },
    }
}

/// Logs go to stderr so stdout stays `key=value`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
