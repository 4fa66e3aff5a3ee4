use clap::Parser;
use sensim::{Config, Prepare};
use std::{error::Error, path::PathBuf};

/// Builds the Chinese Whispers input from a pair similarity file.
#[derive(Parser, Debug)]
#[command(name = "prepare-clustering", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// minimal similarity of a kept entry, also the suffix of the outputs
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    prune: i64,

    /// `pair \t pair \t similarity` file, defaults to sensim_lmi_l200.gz of the clustering folder
    #[arg(long)]
    input: Option<PathBuf>,

    /// `pair \t pattern \t lmi` file, when given the pair-pattern matrix is written too
    #[arg(long)]
    ctx_lmi: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let input = args.input.unwrap_or_else(|| params.clust_file("sensim_lmi_l200.gz"));
    let graph = Prepare::run(&input, args.ctx_lmi.as_deref(), &params.clust_dir, args.prune, params.max_rank)?;
    println!("{} pairs, {} matrix entries", graph.dictionary.len(), graph.matrix.len());
    Ok(())
}
