use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 short_url_map 表
        manager
            .create_table(
                Table::create()
                    .table(ShortUrlMap::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortUrlMap::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortUrlMap::LongUrl).text().not_null())
                    .col(
                        ColumnDef::new(ShortUrlMap::Fingerprint)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShortUrlMap::Token).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ShortUrlMap::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 指纹唯一：并发提交同一个长链接时由数据库兜底
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_url_map_fingerprint")
                    .table(ShortUrlMap::Table)
                    .col(ShortUrlMap::Fingerprint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // token 唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_url_map_token")
                    .table(ShortUrlMap::Table)
                    .col(ShortUrlMap::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_short_url_map_token")
                    .table(ShortUrlMap::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_short_url_map_fingerprint")
                    .table(ShortUrlMap::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ShortUrlMap::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortUrlMap {
    #[sea_orm(iden = "short_url_map")]
    Table,
    Id,
    LongUrl,
    Fingerprint,
    Token,
    CreatedAt,
}
