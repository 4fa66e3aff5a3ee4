use clap::{Parser, ValueEnum};
use sensim::{Config, Fallback, FeatureModel, Measure, Sat};
use std::{error::Error, path::PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum ModelArg {
    /// noun pair vectors
    #[default]
    Vec,
    /// database export
    Db,
}

impl From<ModelArg> for FeatureModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Vec => FeatureModel::Vectors,
            ModelArg::Db => FeatureModel::Database,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum MeasureArg {
    /// number of shared features
    #[default]
    Overlap,
    /// sum of products of shared feature weights
    Dotproduct,
    /// cosine of the feature weights
    Cosine,
}

impl From<MeasureArg> for Measure {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Overlap => Measure::Overlap,
            MeasureArg::Dotproduct => Measure::DotProduct,
            MeasureArg::Cosine => Measure::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum FallbackArg {
    /// leave the question unanswered
    #[default]
    Abstain,
    /// pick an answer at random
    Random,
}

impl From<FallbackArg> for Fallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Abstain => Fallback::Abstain,
            FallbackArg::Random => Fallback::Random,
        }
    }
}

/// Answers the noun-noun SAT analogy questions from pair features.
#[derive(Parser, Debug)]
#[command(name = "predict-sat", version)]
struct Args {
    /// json file overriding the default parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// root of the data tree
    #[arg(long, env = "SENSIM_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    model: ModelArg,

    #[arg(long, value_enum, default_value_t)]
    measure: MeasureArg,

    /// what to do when no answer scores above zero
    #[arg(long, value_enum, default_value_t)]
    fallback: FallbackArg,
}

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = Config::new(args.config.as_deref(), &args.base_dir)?.get_params();
    println!("{}", params);

    let loss = Sat::run(&params, args.model.into(), args.measure.into(), args.fallback.into())?;
    println!("{}", loss);
    Ok(())
}
