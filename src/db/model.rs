use sqlx::FromRow;

/// 模板记录
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TemplateRecord {
    /// 自增 ID
    pub id: i64,
    /// 图片路径
    pub image_path: String,
    /// biocode 数字串，每个字符为 '0' 或 '1'
    pub biocode: String,
}
