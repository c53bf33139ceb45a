use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::biocode::DEFAULT_LENGTH;
use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "biobench", "biobench").expect("failed to get project dir");
    ConfDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct BiocodeOptions {
    /// 用户种子，决定随机投影矩阵
    #[arg(long, value_name = "SEED", default_value_t = 123)]
    pub seed: u64,
    /// biocode 的比特数
    #[arg(short = 'l', long, value_name = "BITS", default_value_t = DEFAULT_LENGTH)]
    pub length: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct LedgerOptions {
    /// 以太坊 JSON-RPC 节点地址
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:7545")]
    pub rpc_url: String,
    /// 已部署的合约地址，启用 ledger 后端时必填
    #[arg(long, value_name = "ADDRESS")]
    pub contract: Option<String>,
    /// 发送交易使用的账户，不填则使用节点返回的第一个账户
    #[arg(long, value_name = "ADDRESS")]
    pub account: Option<String>,
    /// 合约写入函数签名
    #[arg(long, value_name = "SIGNATURE", default_value = "store(bytes)")]
    pub store_fn: String,
    /// 合约读取函数签名
    #[arg(long, value_name = "SIGNATURE", default_value = "readAt(uint256)")]
    pub read_fn: String,
    /// 等待交易回执时的轮询间隔，单位毫秒
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub poll_interval: u64,
    /// 不写入预热记录
    #[arg(long)]
    pub no_warmup: bool,
}

impl LedgerOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "biobench", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// biobench 数据目录，存放 SQLite 与 LMDB 数据库
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 遍历数据集，测量各后端的写入与读取性能
    Run(RunCommand),
    /// 汇总结果文件，输出统计表与箱线图
    Aggregate(AggregateCommand),
    /// 计算单张图片的 biocode
    Biocode(BiocodeCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回关系型数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("templates.db")
    }

    /// 返回文档数据库（LMDB 环境）目录
    pub fn documents(&self) -> PathBuf {
        self.path.join("documents")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let opts = Opts::parse_from(["biobench", "-c", "/tmp/bb", "run", "dataset"]);
        assert_eq!(opts.conf_dir.database(), PathBuf::from("/tmp/bb/templates.db"));
        assert_eq!(opts.conf_dir.documents(), PathBuf::from("/tmp/bb/documents"));
        let SubCommand::Run(run) = opts.subcmd else {
            panic!("expected run subcommand");
        };
        assert_eq!(run.biocode.seed, 123);
        assert_eq!(run.biocode.length, 1024);
        assert_eq!(run.ledger.store_fn, "store(bytes)");
        assert_eq!(run.ledger.poll_interval(), Duration::from_millis(100));
        assert!(run.limit.is_none());
    }
}
