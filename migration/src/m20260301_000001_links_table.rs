use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Link::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Link::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Link::Code).string().not_null())
                    .col(ColumnDef::new(Link::OriginalUrl).text().not_null())
                    .col(
                        ColumnDef::new(Link::ExpireAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Link::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Link::CreatedBy).big_integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_code")
                    .table(Link::Table)
                    .col(Link::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // The reaper scans on expire_at
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_expire_at")
                    .table(Link::Table)
                    .col(Link::ExpireAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_links_expire_at").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_links_code").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Link::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Link {
    #[sea_orm(iden = "links")]
    Table,
    Id,
    Code,
    OriginalUrl,
    ExpireAt,
    CreatedAt,
    CreatedBy,
}
