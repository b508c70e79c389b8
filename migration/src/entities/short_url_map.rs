use sea_orm::entity::prelude::*;

/// 长链接与短 token 的映射，创建后不再修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "short_url_map")]
pub struct Model {
    /// 发号器分配的序号，token 解码后即为该值
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub long_url: String,
    /// long_url 的 128 位内容指纹（hex）
    #[sea_orm(unique)]
    pub fingerprint: String,
    #[sea_orm(unique)]
    pub token: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
