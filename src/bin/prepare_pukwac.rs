use clap::Parser;
use sensim::{Config, Corpus};
use std::{error::Error, path::PathBuf};

/// Rewrites the gzipped PukWaC parts as one sentence per line.
#[derive(Parser, Debug)]
#[command(name = "prepare-pukwac", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let outputs = Corpus::run(&params.wacky_dir.join("pukwac"), &params.wacky_dir.join("pukwac_for_pig"))?;
    println!("reformatted {} corpus files", outputs.len());
    Ok(())
}
