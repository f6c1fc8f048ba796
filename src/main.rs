//! psummary-etl command line
//!
//! Runs the cache-fill, export and phylum listing passes for one index
//! source.
//!
//! # Example
//!
//! ```bash
//! psummary-etl --data-dir ./data --preset rindex --cache --csv
//! psummary-etl --data-dir ./data \
//!   --index-path index.tsv --summary-path 'summary/$ID.psummary' -n 1000 --cache
//! ```

use clap::{ArgGroup, Parser, ValueEnum};
use psummary_etl::{Config, Error, PhylumNaming, Pipeline, SourceConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Built-in index sources
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    /// dindex.tsv, dsummary/$ID.psummary, dfamily/dphylum/dsequence tables
    Dindex,
    /// rindex.tsv, rsummary/$ID.psummary, rfamily/rphylum/rsequence tables
    Rindex,
}

impl Preset {
    /// Replace the source; `rindex` also turns on full phylum names unless
    /// another naming was already chosen
    fn apply(self, config: &mut Config) {
        match self {
            Preset::Dindex => config.source = SourceConfig::dindex(),
            Preset::Rindex => {
                config.source = SourceConfig::rindex();
                if config.phylum_names == PhylumNaming::Code {
                    config.phylum_names = PhylumNaming::Builtin;
                }
            }
        }
    }
}

/// Fetch psummary documents into a local cache and export them as gzip CSV
#[derive(Parser, Debug)]
#[command(name = "psummary-etl")]
#[command(about = "Fetch psummary documents into a local cache and export gzip CSV tables")]
#[command(group(ArgGroup::new("action").required(true).multiple(true).args(["cache", "csv", "phy"])))]
struct Args {
    /// JSON configuration file; other flags override its values
    #[arg(long, env = "PSUMMARY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the index copy, the cache and the output tables
    #[arg(long, env = "PSUMMARY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Built-in index source
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Object store key of the index file
    #[arg(long)]
    index_path: Option<String>,

    /// Object store key template of a summary ($ID is replaced by the record id)
    #[arg(long)]
    summary_path: Option<String>,

    /// Object store endpoint
    #[arg(long, env = "PSUMMARY_ENDPOINT")]
    endpoint: Option<String>,

    /// Stop each pass after this many records
    #[arg(short = 'n', long)]
    limit: Option<u64>,

    /// Maximum concurrent summary fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// JSON file mapping phylum codes to names
    #[arg(long)]
    phylum_name_dictionary_path: Option<PathBuf>,

    /// Use the built-in full phylum names
    #[arg(long)]
    full_phylum_names: bool,

    /// Fill the cache from the index
    #[arg(long)]
    cache: bool,

    /// Export the cache as gzip CSV tables
    #[arg(long)]
    csv: bool,

    /// Print the distinct phylum codes found in the cache
    #[arg(long)]
    phy: bool,
}

impl Args {
    /// Build the configuration: config file (if any), then preset, then flags
    async fn to_config(&self) -> psummary_etl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path).await?,
            None => Config::new(
                self.data_dir.clone().unwrap_or_default(),
                SourceConfig::new(String::new(), String::new()),
            ),
        };

        if let Some(preset) = self.preset {
            preset.apply(&mut config);
        }

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(index_path) = &self.index_path {
            config.source.index_path = index_path.clone();
        }
        if let Some(summary_path) = &self.summary_path {
            config.source.summary_path = summary_path.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if self.full_phylum_names {
            config.phylum_names = PhylumNaming::Builtin;
        }
        if let Some(path) = &self.phylum_name_dictionary_path {
            config.phylum_names = PhylumNaming::Dictionary(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run(args: Args, config: Config) -> psummary_etl::Result<()> {
    let pipeline = Pipeline::new(config).await?;

    if args.cache {
        let report = pipeline.fill_cache().await?;
        info!(
            fetched = report.fetched,
            absent = report.absent,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Cache pass done"
        );
    }

    if args.csv {
        let report = pipeline.export().await?;
        info!(
            family = report.family_rows,
            phylum = report.phylum_rows,
            sequence = report.sequence_rows,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "CSV pass done"
        );
    }

    if args.phy {
        for phylum in pipeline.list_phyla().await? {
            println!("{}", phylum);
        }
    }

    pipeline.close().await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("psummary_etl=info")),
        )
        .init();

    let args = Args::parse();

    let config = match args.to_config().await {
        Ok(config) => config,
        Err(e @ Error::Config { .. }) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        data_dir = %config.data_dir.display(),
        index = %config.source.index_path,
        endpoint = %config.endpoint,
        "Starting psummary-etl"
    );

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
