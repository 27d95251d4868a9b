//! `pcat`: operator CLI for the preservation catalog audit engine.
//!
//! Thin wiring only: config -> Postgres store -> reconciler -> dispatcher.
//! Audit semantics live in `pcat-reconcile`.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pcat")]
#[command(about = "Preservation catalog audit CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> host)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run one audit for one druid on one storage root
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Audit trail utilities
    Trail {
        #[command(subcommand)]
        cmd: TrailCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply embedded SQL migrations.
    Migrate,

    /// Upsert the storage roots listed in config.
    SyncRoots,
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long)]
    druid: String,

    /// Storage root name, as registered in the catalog
    #[arg(long = "storage-root")]
    storage_root: String,
}

#[derive(Args)]
struct ObservedArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Observed version: `3` or `v0003`
    #[arg(long)]
    version: String,

    /// Observed size in bytes
    #[arg(long)]
    size: Option<i64>,
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Make sure the catalog knows about a moab seen on storage.
    CheckExistence(ObservedArgs),

    /// Create the catalog entry for a new moab.
    Create {
        #[command(flatten)]
        observed: ObservedArgs,

        /// Validate the moab layout before creating
        #[arg(long, default_value_t = false)]
        after_validation: bool,

        /// Caller already validated checksums
        #[arg(long, default_value_t = false)]
        checksums_validated: bool,
    },

    /// Move the catalog forward to a version written to storage.
    Update {
        #[command(flatten)]
        observed: ObservedArgs,

        #[arg(long, default_value_t = false)]
        after_validation: bool,

        #[arg(long, default_value_t = false)]
        checksums_validated: bool,
    },

    /// Re-check a version the catalog already has.
    Confirm(ObservedArgs),

    /// Compare the catalog record against what storage holds.
    CatalogToMoab(TargetArgs),

    /// Re-hash every file in the moab.
    Checksum(TargetArgs),
}

#[derive(Subcommand)]
enum TrailCmd {
    /// Verify the hash chain of an audit trail file.
    Verify {
        #[arg(required = true)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let cfg = commands::load_config(&cli.config_paths)?;
            let pool = pcat_db::connect_from_env_with(cfg.catalog.database.max_connections).await?;
            match cmd {
                DbCmd::Status => commands::db::status(&pool).await?,
                DbCmd::Migrate => commands::db::migrate(&pool).await?,
                DbCmd::SyncRoots => commands::db::sync_roots(&pool, &cfg.catalog).await?,
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = pcat_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Audit { cmd } => {
            let cfg = commands::load_config(&cli.config_paths)?;
            let engine = commands::Engine::connect(&cfg).await?;
            commands::audit::run(&engine, cmd.into_call()).await?;
        }

        Commands::Trail { cmd } => match cmd {
            TrailCmd::Verify { path } => commands::audit::verify_trail(&path)?,
        },
    }

    Ok(())
}

impl AuditCmd {
    fn into_call(self) -> commands::audit::AuditCall {
        use commands::audit::AuditCall;
        match self {
            AuditCmd::CheckExistence(o) => AuditCall::CheckExistence(o.into()),
            AuditCmd::Create {
                observed,
                after_validation,
                checksums_validated,
            } => AuditCall::Create {
                req: observed.into(),
                after_validation,
                checksums_validated,
            },
            AuditCmd::Update {
                observed,
                after_validation,
                checksums_validated,
            } => AuditCall::Update {
                req: observed.into(),
                after_validation,
                checksums_validated,
            },
            AuditCmd::Confirm(o) => AuditCall::Confirm(o.into()),
            AuditCmd::CatalogToMoab(t) => AuditCall::CatalogToMoab {
                druid: t.druid,
                storage_root: t.storage_root,
            },
            AuditCmd::Checksum(t) => AuditCall::Checksum {
                druid: t.druid,
                storage_root: t.storage_root,
            },
        }
    }
}

impl From<ObservedArgs> for pcat_reconcile::AuditRequest {
    fn from(o: ObservedArgs) -> Self {
        pcat_reconcile::AuditRequest::new(
            o.target.druid,
            o.version.as_str(),
            o.size,
            o.target.storage_root,
        )
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
