use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 发号器表：name 为计数器 key，seq_value 为最近一次发出的号码
        manager
            .create_table(
                Table::create()
                    .table(SequenceCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SequenceCounters::Name)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SequenceCounters::SeqValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SequenceCounters {
    Table,
    Name,
    SeqValue,
}
