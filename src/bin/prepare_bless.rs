use clap::Parser;
use sensim::{Bless, Config};
use std::{error::Error, path::PathBuf};

/// Selects the noun-noun relations of BLESS.
#[derive(Parser, Debug)]
#[command(name = "prepare-bless", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// also write the gold standard of the clustering evaluator
    #[arg(long)]
    gold: bool,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let input = params.bless_file("bless-gems/BLESS.txt");
    let output = params.bless_file("bless_nouns.tsv");
    let gold = params.clust_file("bless_nouns_clust.tsv");

    let stats = Bless::run(&input, &output, args.gold.then_some(gold.as_path()))?;
    println!("{} noun-noun pairs written to {}", stats.written, output.display());
    Ok(())
}
