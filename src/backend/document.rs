use std::path::Path;

use anyhow::{Context, Result};
use byteorder::BigEndian;
use heed::types::{DecodeIgnore, SerdeJson, U64};
use heed::{Database, Env, EnvOpenOptions, WithTls};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{BackendKind, StorageBackend};
use crate::biocode::Biocode;

/// 集合中的一条文档
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    pub image_path: String,
    /// biocode 的整数数组形式
    pub biocode: Vec<u8>,
}

/// 基于 LMDB 的文档型后端
///
/// 文档以 JSON 存储，键为大端序的自增 ID，因此遍历顺序即写入顺序。
pub struct DocumentBackend {
    env: Env<WithTls>,
    db: Database<U64<BigEndian>, SerdeJson<TemplateDocument>>,
}

impl DocumentBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("无法创建目录: {}", path.display()))?;
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 30) // 1GiB 足够存放百万级模板
                .max_dbs(1)
                .open(path)
                .with_context(|| format!("无法打开文档数据库: {}", path.display()))?
        };
        let mut txn = env.write_txn()?;
        let db = env.create_database(&mut txn, Some("templates"))?;
        txn.commit()?;
        Ok(Self { env, db })
    }

    /// 集合中的文档数量
    pub fn len(&self) -> Result<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.len(&rtxn)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, id: u64) -> Result<Option<TemplateDocument>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.get(&rtxn, &id)?)
    }
}

impl StorageBackend for DocumentBackend {
    /// 命中文档的 ID
    type Match = u64;

    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    async fn reset(&mut self) -> Result<()> {
        info!("清空文档集合");
        let mut wtxn = self.env.write_txn()?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    async fn insert(&mut self, image_path: &str, biocode: &Biocode) -> Result<()> {
        let doc = TemplateDocument { image_path: image_path.to_owned(), biocode: biocode.bits().to_vec() };
        let mut wtxn = self.env.write_txn()?;
        let id = match self.db.remap_data_type::<DecodeIgnore>().last(&wtxn)? {
            Some((last, ())) => last + 1,
            None => 0,
        };
        self.db.put(&mut wtxn, &id, &doc)?;
        wtxn.commit()?;
        debug!("document: {} -> {}", image_path, id);
        Ok(())
    }

    /// 全表扫描，返回第一个 biocode 完全相同的文档
    async fn read(&mut self, _image_path: &str, biocode: &Biocode) -> Result<Option<u64>> {
        let rtxn = self.env.read_txn()?;
        for entry in self.db.iter(&rtxn)? {
            let (id, doc) = entry?;
            if doc.biocode == biocode.bits() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn close(self) -> Result<()> {
        self.env.prepare_for_closing().wait();
        Ok(())
    }
}
