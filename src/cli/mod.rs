mod aggregate;
mod biocode;
mod run;

pub use aggregate::*;
pub use biocode::*;
pub use run::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
