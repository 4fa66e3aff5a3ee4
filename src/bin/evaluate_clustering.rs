use clap::{Parser, ValueEnum};
use sensim::{Baseline, Config, Evaluate};
use std::{error::Error, path::PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BaselineArg {
    /// every pair in one cluster
    Single,
    /// one cluster per pair
    Singletons,
    /// four random clusters
    Random,
}

impl From<BaselineArg> for Baseline {
    fn from(arg: BaselineArg) -> Self {
        match arg {
            BaselineArg::Single => Baseline::Single,
            BaselineArg::Singletons => Baseline::Singletons,
            BaselineArg::Random => Baseline::Random,
        }
    }
}

/// Scores a Chinese Whispers clustering against the BLESS relations.
#[derive(Parser, Debug)]
#[command(name = "evaluate-clustering", version)]
struct Args {
    /// suffix of the clustering files, e.g. the prune value
    variant: String,

    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// score a replacement clustering instead
    #[arg(long, value_enum)]
    baseline: Option<BaselineArg>,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let report = Evaluate::run(&params, &args.variant, args.baseline.map(Baseline::from))?;
    println!("{}", report);
    Ok(())
}
