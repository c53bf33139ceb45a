use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::TemplateRecord;

/// 创建模板表，已存在时不做任何事
pub async fn create_table<'c, E>(executor: E) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_path TEXT NOT NULL,
            biocode TEXT NOT NULL
        )
        "#,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// 添加模板记录
pub async fn add_template<'c, E>(executor: E, image_path: &str, biocode: &str) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO templates (image_path, biocode)
        VALUES (?, ?)
        RETURNING id
        "#,
    )
    .bind(image_path)
    .bind(biocode)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 按 biocode 精确匹配，最多返回一条记录的 ID
pub async fn find_template_id(executor: &SqlitePool, biocode: &str) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM templates WHERE biocode = ? LIMIT 1
        "#,
    )
    .bind(biocode)
    .fetch_optional(executor)
    .await
}

pub async fn get_template(executor: &SqlitePool, id: i64) -> Result<TemplateRecord> {
    sqlx::query_as::<_, TemplateRecord>(
        r#"
        SELECT id, image_path, biocode FROM templates WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// 删除所有模板记录
pub async fn delete_templates(executor: &SqlitePool) -> Result<()> {
    sqlx::query(r#"DELETE FROM templates"#).execute(executor).await?;
    Ok(())
}

pub async fn count_templates(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM templates"#).fetch_one(executor).await
}
