//! 三种可互换的存储后端：关系型（SQLite）、文档型（LMDB）、区块链合约（JSON-RPC）

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::biocode::Biocode;
use crate::config::LedgerOptions;

pub mod abi;
pub mod document;
pub mod ledger;
pub mod relational;

pub use document::DocumentBackend;
pub use ledger::{LedgerBackend, LedgerError};
pub use relational::RelationalBackend;

/// 后端标签，也决定了同一张图片上各后端的执行顺序
#[derive(
    ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite 表，biocode 存为定宽数字串
    Relational,
    /// LMDB 文档集合，biocode 存为整数数组
    Document,
    /// 智能合约，biocode 存为原始字节串
    Ledger,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
            Self::Ledger => "ledger",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 所有后端共享的最小能力集
pub trait StorageBackend {
    /// 查询命中时返回的原生结果
    type Match: Send;

    fn kind(&self) -> BackendKind;

    /// 运行开始前清理或初始化存储
    fn reset(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn insert(
        &mut self,
        image_path: &str,
        biocode: &Biocode,
    ) -> impl Future<Output = Result<()>> + Send;

    fn read(
        &mut self,
        image_path: &str,
        biocode: &Biocode,
    ) -> impl Future<Output = Result<Option<Self::Match>>> + Send;

    /// 释放连接等资源
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// 打开后端所需的参数
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// SQLite 数据库文件
    pub database: PathBuf,
    /// LMDB 环境目录
    pub documents: PathBuf,
    /// 重置时是否清空关系型数据库中的旧记录
    pub truncate: bool,
    pub ledger: LedgerOptions,
}

/// 按标签选择的具体后端
pub enum Backend {
    Relational(RelationalBackend),
    Document(DocumentBackend),
    Ledger(LedgerBackend),
}

impl Backend {
    pub async fn open(kind: BackendKind, config: &BackendConfig) -> Result<Self> {
        Ok(match kind {
            BackendKind::Relational => {
                Self::Relational(RelationalBackend::open(&config.database, config.truncate).await?)
            }
            BackendKind::Document => Self::Document(DocumentBackend::open(&config.documents)?),
            BackendKind::Ledger => Self::Ledger(LedgerBackend::open(&config.ledger).await?),
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Relational(b) => b.kind(),
            Self::Document(b) => b.kind(),
            Self::Ledger(b) => b.kind(),
        }
    }

    pub async fn reset(&mut self) -> Result<()> {
        match self {
            Self::Relational(b) => b.reset().await,
            Self::Document(b) => b.reset().await,
            Self::Ledger(b) => b.reset().await,
        }
    }

    /// 只有 ledger 后端需要预热
    pub async fn warmup(&mut self) -> Result<()> {
        match self {
            Self::Ledger(b) => b.warmup().await,
            _ => Ok(()),
        }
    }

    pub async fn insert(&mut self, image_path: &str, biocode: &Biocode) -> Result<()> {
        match self {
            Self::Relational(b) => b.insert(image_path, biocode).await,
            Self::Document(b) => b.insert(image_path, biocode).await,
            Self::Ledger(b) => b.insert(image_path, biocode).await,
        }
    }

    /// 查询是否命中，结果本身不会被使用
    pub async fn read(&mut self, image_path: &str, biocode: &Biocode) -> Result<bool> {
        Ok(match self {
            Self::Relational(b) => b.read(image_path, biocode).await?.is_some(),
            Self::Document(b) => b.read(image_path, biocode).await?.is_some(),
            Self::Ledger(b) => b.read(image_path, biocode).await?.is_some(),
        })
    }

    pub async fn close(self) -> Result<()> {
        match self {
            Self::Relational(b) => b.close().await,
            Self::Document(b) => b.close().await,
            Self::Ledger(b) => b.close().await,
        }
    }
}

/// 一次运行持有的全部后端，按 [`BackendKind`] 的顺序排列
pub struct Backends(Vec<Backend>);

impl Backends {
    /// 任何一个后端打开失败时，已打开的后端会被关闭
    pub async fn open(kinds: &[BackendKind], config: &BackendConfig) -> Result<Self> {
        let mut kinds = kinds.to_vec();
        kinds.sort_unstable();
        kinds.dedup();

        let mut backends = Vec::with_capacity(kinds.len());
        for kind in kinds {
            info!("打开后端: {}", kind);
            match Backend::open(kind, config).await {
                Ok(backend) => backends.push(backend),
                Err(e) => {
                    // 先释放已经打开的后端
                    let _ = Self(backends).close().await;
                    return Err(e.context(format!("打开后端 {} 失败", kind)));
                }
            }
        }
        Ok(Self(backends))
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.0.iter().map(|b| b.kind()).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Backend> {
        self.0.iter_mut()
    }

    pub async fn reset(&mut self) -> Result<()> {
        for backend in self.0.iter_mut() {
            backend.reset().await?;
        }
        Ok(())
    }

    pub async fn warmup(&mut self) -> Result<()> {
        for backend in self.0.iter_mut() {
            backend.warmup().await?;
        }
        Ok(())
    }

    /// 关闭所有后端，返回遇到的第一个错误
    pub async fn close(self) -> Result<()> {
        let mut result = Ok(());
        for backend in self.0 {
            let kind = backend.kind();
            if let Err(e) = backend.close().await {
                log::error!("关闭后端 {} 失败: {}", kind, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
