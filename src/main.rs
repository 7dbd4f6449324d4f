//! chado-sync CLI: reconcile annotation batches against a Chado-style store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use chado_sync::audit::{AuditSink, JsonSink, LineSink, SilentSink};
use chado_sync::config::{AuditFormat, SyncConfig};
use chado_sync::essentials::{self, ReferenceSeed};
use chado_sync::import::{self, ImportSession};
use chado_sync::model::Table;
use chado_sync::store::Backend;
use chado_sync::store::durable::DurableStore;

#[derive(Parser)]
#[command(name = "chado-sync", version, about = "Reconcile genome annotation against a Chado store")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true, default_value = "chado-sync.toml")]
    config: PathBuf,

    /// Data directory for persistent storage (overrides the config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print one line per effective change.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print changes as newline-delimited JSON (implies --verbose).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find or insert reference data (organisms, vocabularies, publications).
    Seed {
        /// JSON reference seed document.
        #[arg(long)]
        file: PathBuf,
    },

    /// Reconcile a batch of features against the store.
    Import {
        /// Organism abbreviation.
        #[arg(long)]
        organism: String,

        /// JSON array of features.
        #[arg(long)]
        file: PathBuf,

        /// Mark features of the organism missing from the batch as obsolete.
        #[arg(long)]
        obsolete_absent: bool,
    },

    /// Mark one feature as obsolete.
    Obsolete {
        /// Organism abbreviation.
        #[arg(long)]
        organism: String,

        /// Unique name of the feature.
        #[arg(long)]
        uniquename: String,
    },

    /// Show row counts per table.
    Stats,
}

fn audit_sink(config: &SyncConfig) -> Box<dyn AuditSink> {
    match (config.audit.verbose, config.audit.format) {
        (false, _) => Box::new(SilentSink),
        (true, AuditFormat::Text) => Box::new(LineSink::stdout()),
        (true, AuditFormat::Json) => Box::new(JsonSink::stdout()),
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SyncConfig::load_or_default(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }
    if cli.verbose || cli.json {
        config.audit.verbose = true;
    }
    if cli.json {
        config.audit.format = AuditFormat::Json;
    }

    let sink = audit_sink(&config);
    let mut store = DurableStore::open(&config.store.data_dir)?;

    match cli.command {
        Commands::Seed { file } => {
            let seed = ReferenceSeed::from_path(&file)?;
            let txn = store.begin()?;
            let (report, _) = ImportSession::run(txn, sink.as_ref(), &config.vocabularies, |session| {
                let audit = session.audit();
                essentials::seed(session.store(), audit, &seed)
            })?;
            println!(
                "Seeded {} from {}: {} inserted, {} already present",
                config.store.data_dir.display(),
                file.display(),
                report.inserted,
                report.existing
            );
        }

        Commands::Import {
            organism,
            file,
            obsolete_absent,
        } => {
            let batch = import::read_batch(&file)?;
            let txn = store.begin()?;
            let (features, stats) =
                ImportSession::run(txn, sink.as_ref(), &config.vocabularies, |session| {
                    let organism = session.organism(&organism)?;
                    session.import_batch(&organism, &batch, obsolete_absent)
                })?;
            println!("Imported {} features from {}: {stats}", features.len(), file.display());
        }

        Commands::Obsolete {
            organism,
            uniquename,
        } => {
            let txn = store.begin()?;
            let (feature, _) = ImportSession::run(txn, sink.as_ref(), &config.vocabularies, |session| {
                let organism = session.organism(&organism)?;
                session.mark_obsolete(&organism, &uniquename)
            })?;
            println!("Feature '{}' is obsolete", feature.uniquename);
        }

        Commands::Stats => {
            println!("Store: {}", config.store.data_dir.display());
            for table in Table::ALL {
                let rows = store.len(table)?;
                println!("  {:<22} {rows}", table.name());
            }
        }
    }

    Ok(())
}
