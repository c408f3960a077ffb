pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod hamming;
pub mod hash;
pub mod utils;

pub use checker::{Checker, CheckerBuilder, Report, SimilarityResult};
pub use config::Opts;
pub use error::CheckError;
pub use hash::{HashAlg, ImageHash};
