use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum EmployeeProfile {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UserProfile {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ReviewCycle {
    Table,
    Id,
    Name,
    PeriodStart,
    PeriodEnd,
    DueDate,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PerformanceReview {
    Table,
    Id,
    CycleId,
    EmployeeId,
    ReviewerId,
    Status,
    Rating,
    Summary,
    Strengths,
    Improvements,
    Goals,
    SubmittedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Conversation {
    Table,
    Id,
    UserId,
    Title,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ChatMessage {
    Table,
    Id,
    ConversationId,
    Role,
    Content,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReviewCycle::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReviewCycle::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ReviewCycle::Name).string_len(256).not_null())
                    .col(ColumnDef::new(ReviewCycle::PeriodStart).date().not_null())
                    .col(ColumnDef::new(ReviewCycle::PeriodEnd).date().not_null())
                    .col(ColumnDef::new(ReviewCycle::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(ReviewCycle::Status)
                            .string_len(16)
                            .not_null()
                            .default("UPCOMING"),
                    )
                    .col(ColumnDef::new(ReviewCycle::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(ReviewCycle::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PerformanceReview::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PerformanceReview::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PerformanceReview::CycleId).uuid().not_null())
                    .col(ColumnDef::new(PerformanceReview::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(PerformanceReview::ReviewerId).uuid())
                    .col(
                        ColumnDef::new(PerformanceReview::Status)
                            .string_len(16)
                            .not_null()
                            .default("NOT_STARTED"),
                    )
                    .col(ColumnDef::new(PerformanceReview::Rating).double())
                    .col(ColumnDef::new(PerformanceReview::Summary).text())
                    .col(ColumnDef::new(PerformanceReview::Strengths).text())
                    .col(ColumnDef::new(PerformanceReview::Improvements).text())
                    .col(ColumnDef::new(PerformanceReview::Goals).json_binary().not_null())
                    .col(ColumnDef::new(PerformanceReview::SubmittedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PerformanceReview::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(PerformanceReview::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_cycle")
                            .from(PerformanceReview::Table, PerformanceReview::CycleId)
                            .to(ReviewCycle::Table, ReviewCycle::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_employee")
                            .from(PerformanceReview::Table, PerformanceReview::EmployeeId)
                            .to(EmployeeProfile::Table, EmployeeProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_reviewer")
                            .from(PerformanceReview::Table, PerformanceReview::ReviewerId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_review_cycle_employee")
                    .table(PerformanceReview::Table)
                    .col(PerformanceReview::CycleId)
                    .col(PerformanceReview::EmployeeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Conversation::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Conversation::UserId).uuid().not_null())
                    .col(ColumnDef::new(Conversation::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Conversation::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Conversation::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_user")
                            .from(Conversation::Table, Conversation::UserId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_user")
                    .table(Conversation::Table)
                    .col(Conversation::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatMessage::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ChatMessage::ConversationId).uuid().not_null())
                    .col(ColumnDef::new(ChatMessage::Role).string_len(16).not_null())
                    .col(ColumnDef::new(ChatMessage::Content).text().not_null())
                    .col(ColumnDef::new(ChatMessage::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_conversation")
                            .from(ChatMessage::Table, ChatMessage::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_conversation")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::ConversationId)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PerformanceReview::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReviewCycle::Table).to_owned())
            .await?;
        Ok(())
    }
}
