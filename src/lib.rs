
pub mod config;
pub mod errors;
pub mod relations;
pub mod frequency;
pub mod pukwac;
pub mod clustering;
pub mod metrics;
pub mod evaluation;
pub mod similarity;
pub mod sat;
pub mod plot;

pub use config::{files_handling, Config, Params};
pub use errors::{Result, SensimError};
pub use relations::{Bless, Relation};
pub use frequency::Counts;
pub use pukwac::Corpus;
pub use clustering::Prepare;
pub use evaluation::{Baseline, Evaluate};
pub use similarity::Measure;
pub use sat::{Fallback, FeatureModel, Sat};
pub use plot::Plot;
