use clap::Parser;
use sensim::{Config, Counts};
use std::{error::Error, path::PathBuf};

/// Frequency statistics over the BLESS noun relations.
#[derive(Parser, Debug)]
#[command(name = "analyze-bless", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// relation triples, defaults to bless_nouns.tsv of the BLESS folder
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let input = args.input.unwrap_or_else(|| params.bless_file("bless_nouns.tsv"));
    let counts = Counts::run(&input)?;
    println!("{}", counts);
    Ok(())
}
