use clap::{Parser, Subcommand};
use sensim::{Config, Plot};
use std::{error::Error, path::PathBuf};

/// Figures of the clustering and SAT outputs.
#[derive(Parser, Debug)]
#[command(name = "plot", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, global = true, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// distribution of cluster sizes of clustering_<variant>.read
    Sizes {
        variant: String,
        #[arg(long, default_value = "cluster_sizes.png")]
        output: PathBuf,
    },
    /// sparsity pattern of id_id_lmi_<variant>
    Matrix {
        variant: String,
        #[arg(long, default_value = "matrix.png")]
        output: PathBuf,
    },
    /// confusion matrix of the SAT predictions
    Confusion {
        #[arg(long, default_value = "confusion.png")]
        output: PathBuf,
    },
    /// histogram of a file with one number per line
    Histogram {
        input: PathBuf,
        #[arg(long, default_value_t = 20)]
        bins: usize,
        #[arg(long, default_value = "histogram.png")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    match args.command {
        Command::Sizes { variant, output } => {
            let counter = Plot::cluster_sizes(&params.clust_file(&format!("clustering_{}.read", variant)), &output)?;
            let counter: Vec<String> = counter.iter().map(|(size, n)| format!("{}: {}", size, n)).collect();
            println!("cluster sizes: {{{}}}", counter.join(", "));
        },
        Command::Matrix { variant, output } => {
            Plot::sparse_matrix(&params.clust_file(&format!("id_id_lmi_{}", variant)), &output)?;
        },
        Command::Confusion { output } => {
            let matrix = Plot::sat_confusion(&params.sat_file("predictions.tsv"), &output)?;
            println!("{:.2}", matrix);
        },
        Command::Histogram { input, bins, output } => {
            let counts = Plot::histogram(&input, bins, &output)?;
            println!("{:?}", counts);
        },
    }
    Ok(())
}
