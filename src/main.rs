use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use tsr_core::{distances_semantic, InferenceConfig, Item, ScoringMode};
use tsr_eval::{explicit, implicit, provenance, ExplicitConfig, ImplicitConfig, ProvenanceConfig};
use tsr_storage::{append_records, dataset_name, load_corpus};

/// Two-Step Relation inference over an embedded corpus
#[derive(Parser, Debug)]
#[command(name = "tsr")]
#[command(about = "Rank candidate relations by routes through semantic neighbours", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Leave-one-out evaluation against positive and negative labels
    Explicit {
        #[command(flatten)]
        common: CommonArgs,

        /// Path for the CSV file to append results to
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Name of the negative relation label
        #[arg(short, long = "neg")]
        negative: String,
    },
    /// Rank each positive label among randomly drawn items
    Implicit {
        #[command(flatten)]
        common: CommonArgs,

        /// Path for the CSV file to append results to
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Random pools drawn per positive label
        #[arg(short = 'r', long = "rep", default_value_t = 1)]
        repeats: usize,

        /// Items ranked per case, the positive included
        #[arg(long, default_value_t = implicit::DEFAULT_POOL_SIZE)]
        pool_size: usize,

        /// Seed of the pool sampler
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads, one per core when absent
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Write the ranked targets of one query with their routes
    Provenance {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory for the report file
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Index of the query. Items are listed when absent.
        #[arg(short, long)]
        query: Option<usize>,

        /// Print the report instead of writing it
        #[arg(long)]
        stdout: bool,
    },
    /// List corpus items with their index
    Items {
        /// Path to the JSON corpus
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Path to the JSON corpus of items with embeddings
    #[arg(short, long)]
    input: PathBuf,

    /// Name of the positive relation label
    #[arg(short, long = "pos")]
    positive: String,

    /// Scoring mode, a* or a to q
    #[arg(short, long, default_value = "a*")]
    mode: ScoringMode,

    /// Labelled neighbours routed through per query, 0 for all
    #[arg(long, default_value_t = 5)]
    max_similar: usize,

    /// Allowed neighbours added per related item, 0 for all
    #[arg(long, default_value_t = 10)]
    max_related: usize,
}

impl CommonArgs {
    fn inference(&self) -> InferenceConfig {
        InferenceConfig::new(Some(self.max_similar), Some(self.max_related), self.mode)
    }

    fn load(&self) -> anyhow::Result<Vec<Item>> {
        load_corpus(&self.input)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting TSR v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Explicit {
            common,
            out,
            negative,
        } => run_explicit(&common, &negative, out.as_deref()),
        Command::Implicit {
            common,
            out,
            repeats,
            pool_size,
            seed,
            workers,
        } => {
            let mut config = ImplicitConfig::new(common.positive.clone(), common.mode, repeats);
            config.inference = common.inference();
            config.pool_size = pool_size;
            config.seed = seed;
            config.workers = workers;
            config.dataset = dataset_name(&common.input);
            run_implicit(&common, &config, out.as_deref())
        }
        Command::Provenance {
            common,
            out,
            query,
            stdout,
        } => run_provenance(&common, &out, query, stdout),
        Command::Items { input } => {
            let items = load_corpus(&input)?;
            println!("{}", provenance::list_items(&items));
            Ok(())
        }
    }
}

fn run_explicit(common: &CommonArgs, negative: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let items = common.load()?;
    let distances = distances_semantic(&items)?;

    let mut config = ExplicitConfig::new(common.positive.clone(), negative, common.mode);
    config.inference = common.inference();
    config.dataset = dataset_name(&common.input);

    let Some(report) = explicit::evaluate_items(&items, &distances, &config)? else {
        return Ok(());
    };
    println!("\n{}", report.text);

    if let Some(path) = out {
        info!("Appending results to {}", path.display());
        append_records(path, std::slice::from_ref(&report), explicit::CSV_IGNORED)?;
    }
    Ok(())
}

fn run_implicit(common: &CommonArgs, config: &ImplicitConfig, out: Option<&Path>) -> anyhow::Result<()> {
    let items = common.load()?;
    let distances = distances_semantic(&items)?;

    let Some(report) = implicit::evaluate_items(&items, &distances, config)? else {
        return Ok(());
    };
    println!("\n{}", report.text);

    if let Some(path) = out {
        info!("Appending results to {}", path.display());
        append_records(path, std::slice::from_ref(&report), implicit::CSV_IGNORED)?;
    }
    Ok(())
}

fn run_provenance(
    common: &CommonArgs,
    out: &Path,
    query: Option<usize>,
    stdout: bool,
) -> anyhow::Result<()> {
    let items = common.load()?;
    let Some(query_index) = query else {
        println!("{}", provenance::list_items(&items));
        println!("\nRerun with --query <INDEX> to select an item");
        return Ok(());
    };

    let distances = distances_semantic(&items)?;
    let mut config = ProvenanceConfig::new(common.positive.clone(), common.mode);
    config.inference = common.inference();

    let (query, ranked) = provenance::rank_for_query(&items, &distances, query_index, &config)?;
    if stdout {
        println!("{}", provenance::render_report(query, &ranked));
    } else {
        std::fs::create_dir_all(out)
            .with_context(|| format!("Failed to create {}", out.display()))?;
        provenance::write_report(out, query, &ranked, &config)?;
    }
    Ok(())
}
