pub mod aggregate;
pub mod backend;
pub mod biocode;
pub mod cli;
pub mod config;
pub mod db;
pub mod driver;
pub mod feature;
pub mod harness;
mod metrics;
pub mod plot;
pub mod probe;
pub mod record;
pub mod utils;

pub use biocode::{Biocode, BiocodeGenerator};
pub use config::Opts;
