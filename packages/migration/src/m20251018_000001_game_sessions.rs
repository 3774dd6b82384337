use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum GameSessions {
    Table,
    Id,
    Code,
    HostId,
    Status,
    Mode,
    CurrentRound,
    TotalRounds,
    MaxPlayers,
    Players,
    Chains,
    CreatedAt,
    UpdatedAt,
    EndedAt,
    LockVersion,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // game_sessions: one row per room, roster and chains nested as JSON
        manager
            .create_table(
                Table::create()
                    .table(GameSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameSessions::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::Code)
                            .string_len(12)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GameSessions::HostId).string().not_null())
                    .col(
                        ColumnDef::new(GameSessions::Status)
                            .string_len(16)
                            .not_null()
                            .default("waiting"),
                    )
                    .col(
                        ColumnDef::new(GameSessions::Mode)
                            .string_len(32)
                            .not_null()
                            .default("classic"),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CurrentRound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameSessions::TotalRounds)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GameSessions::MaxPlayers).integer().not_null())
                    .col(ColumnDef::new(GameSessions::Players).json().not_null())
                    .col(ColumnDef::new(GameSessions::Chains).json().not_null())
                    .col(
                        ColumnDef::new(GameSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::EndedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::LockVersion)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        // Reaper scans finished sessions by end time
        manager
            .create_index(
                Index::create()
                    .name("ix_game_sessions_status_ended_at")
                    .table(GameSessions::Table)
                    .col(GameSessions::Status)
                    .col(GameSessions::EndedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("ix_game_sessions_status_ended_at")
                    .table(GameSessions::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(GameSessions::Table).to_owned())
            .await?;

        Ok(())
    }
}
