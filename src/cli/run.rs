use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::backend::{BackendConfig, BackendKind};
use crate::biocode::BiocodeGenerator;
use crate::cli::SubCommandExtend;
use crate::config::{BiocodeOptions, LedgerOptions, Opts};
use crate::driver::{Driver, RunConfig, run_benchmark};
use crate::metrics;
use crate::record::Operation;
use crate::utils::suffix_regex;

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub biocode: BiocodeOptions,
    #[command(flatten)]
    pub ledger: LedgerOptions,
    /// 数据集根目录
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "tif")]
    pub suffix: String,
    /// 后缀匹配时忽略大小写
    #[arg(long)]
    pub ignore_case: bool,
    /// 最多处理的图片数量，无法解码的图片不计入
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    /// 参与测试的后端
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values_t = [BackendKind::Relational, BackendKind::Document]
    )]
    pub backend: Vec<BackendKind>,
    /// 需要测量的操作，只写入时即为填充数据库
    #[arg(long, value_delimiter = ',', default_values_t = [Operation::Insert, Operation::Read])]
    pub operations: Vec<Operation>,
    /// 结果文件
    #[arg(short, long, default_value = "results.csv")]
    pub output: PathBuf,
    /// SQLite 数据库文件，默认位于数据目录下
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// LMDB 环境目录，默认位于数据目录下
    #[arg(long)]
    pub documents: Option<PathBuf>,
    /// 开始前清空关系型数据库中已有的模板
    #[arg(long)]
    pub truncate: bool,
    /// 运行结束后将指标推送到该 push-gateway
    #[arg(long, value_name = "URL")]
    pub push_gateway: Option<String>,
    /// 推送指标时使用的 instance 标签
    #[arg(long, default_value = "biobench")]
    pub instance: String,
}

impl RunCommand {
    pub fn config(&self, opts: &Opts) -> Result<RunConfig> {
        let generator = BiocodeGenerator::new(self.biocode.seed, self.biocode.length);
        Ok(RunConfig {
            dataset: self.path.clone(),
            suffix: suffix_regex(&self.suffix, self.ignore_case)?,
            output: self.output.clone(),
            backends: self.backend.clone(),
            backend: BackendConfig {
                database: self.database.clone().unwrap_or_else(|| opts.conf_dir.database()),
                documents: self.documents.clone().unwrap_or_else(|| opts.conf_dir.documents()),
                truncate: self.truncate,
                ledger: self.ledger.clone(),
            },
            driver: Driver::new(generator, &self.operations, self.limit),
        })
    }
}

impl SubCommandExtend for RunCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let config = self.config(opts)?;
        let result = run_benchmark(&config).await;
        if let Some(url) = &self.push_gateway {
            metrics::push(url, &self.instance).await;
        }
        result.map(|_| ())
    }
}
