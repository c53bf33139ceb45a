use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::aggregate::aggregate;
use crate::cli::SubCommandExtend;
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct AggregateCommand {
    /// 结果文件，目录会展开为其中的 results*.csv
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// 统计表与箱线图的输出目录
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

impl SubCommandExtend for AggregateCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        aggregate(&self.inputs, &self.output_dir)?;
        Ok(())
    }
}
