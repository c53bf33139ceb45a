use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::biocode::generate;
use crate::cli::SubCommandExtend;
use crate::config::{BiocodeOptions, Opts};
use crate::feature;

#[derive(Parser, Debug, Clone)]
pub struct BiocodeCommand {
    #[command(flatten)]
    pub biocode: BiocodeOptions,
    /// 图片路径
    pub image: PathBuf,
    /// 输出的 biocode 前缀比特数，0 表示全部输出
    #[arg(short, long, default_value_t = 64)]
    pub prefix: usize,
}

impl SubCommandExtend for BiocodeCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let features = feature::extract_file(&self.image)
            .ok_or_else(|| anyhow!("无法读取图片: {}", self.image.display()))?;
        let code = generate(&features, self.biocode.seed, self.biocode.length).to_digit_string();
        let shown = match self.prefix {
            0 => &code[..],
            n => &code[..n.min(code.len())],
        };

        println!("features: {}", features.len());
        println!("biocode: {}", code.len());
        println!("{}", shown);
        Ok(())
    }
}
