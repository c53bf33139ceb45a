use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

use super::{BackendKind, StorageBackend};
use crate::biocode::Biocode;
use crate::db::{self, Database, crud};

/// 基于 SQLite 的关系型后端
///
/// biocode 以定宽数字串存入 `templates.biocode`，读取时按数字串精确匹配。
pub struct RelationalBackend {
    db: Database,
    truncate: bool,
}

impl RelationalBackend {
    pub async fn open(path: impl AsRef<Path>, truncate: bool) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
        let db = db::init_db(path)
            .await
            .with_context(|| format!("无法打开数据库: {}", path.display()))?;
        Ok(Self { db, truncate })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl StorageBackend for RelationalBackend {
    /// 命中记录的自增 ID
    type Match = i64;

    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn reset(&mut self) -> Result<()> {
        crud::create_table(&self.db).await?;
        if self.truncate {
            info!("清空关系型数据库中的模板");
            crud::delete_templates(&self.db).await?;
        }
        Ok(())
    }

    async fn insert(&mut self, image_path: &str, biocode: &Biocode) -> Result<()> {
        let id = crud::add_template(&self.db, image_path, &biocode.to_digit_string()).await?;
        debug!("relational: {} -> {}", image_path, id);
        Ok(())
    }

    async fn read(&mut self, _image_path: &str, biocode: &Biocode) -> Result<Option<i64>> {
        Ok(crud::find_template_id(&self.db, &biocode.to_digit_string()).await?)
    }

    async fn close(self) -> Result<()> {
        self.db.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = RelationalBackend::open(dir.path().join("templates.db"), false).await.unwrap();
        backend.reset().await.unwrap();

        let code = Biocode::from_bits([1, 0, 1, 1]);
        assert_eq!(backend.read("a.tif", &code).await.unwrap(), None);
        backend.insert("a.tif", &code).await.unwrap();

        let id = backend.read("a.tif", &code).await.unwrap().unwrap();
        let record = crud::get_template(backend.database(), id).await.unwrap();
        assert_eq!(record.image_path, "a.tif");
        assert_eq!(record.biocode, "1011");

        let other = Biocode::from_bits([0, 0, 0, 0]);
        assert_eq!(backend.read("b.tif", &other).await.unwrap(), None);
        backend.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_keeps_rows_unless_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.db");
        let code = Biocode::from_bits([1, 1]);

        let mut backend = RelationalBackend::open(&path, false).await.unwrap();
        backend.reset().await.unwrap();
        backend.insert("a.tif", &code).await.unwrap();
        backend.reset().await.unwrap();
        assert_eq!(crud::count_templates(backend.database()).await.unwrap(), 1);
        backend.close().await.unwrap();

        let mut backend = RelationalBackend::open(&path, true).await.unwrap();
        backend.reset().await.unwrap();
        assert_eq!(crud::count_templates(backend.database()).await.unwrap(), 0);
        backend.close().await.unwrap();
    }
}
