use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum EmployeeProfile {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum AttendanceRecord {
    Table,
    Id,
    EmployeeId,
    WorkDate,
    CheckIn,
    CheckOut,
    Status,
    LateMarks,
    WorkedMinutes,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PayrollLine {
    Table,
    Id,
    EmployeeId,
    Period,
    BasicPayCents,
    AllowancesCents,
    DeductionsCents,
    TaxCents,
    NetPayCents,
    Status,
    ProcessedAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecord::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AttendanceRecord::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AttendanceRecord::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(AttendanceRecord::WorkDate).date().not_null())
                    .col(ColumnDef::new(AttendanceRecord::CheckIn).time())
                    .col(ColumnDef::new(AttendanceRecord::CheckOut).time())
                    .col(ColumnDef::new(AttendanceRecord::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(AttendanceRecord::LateMarks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecord::WorkedMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AttendanceRecord::Notes).text())
                    .col(ColumnDef::new(AttendanceRecord::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(AttendanceRecord::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_employee")
                            .from(AttendanceRecord::Table, AttendanceRecord::EmployeeId)
                            .to(EmployeeProfile::Table, EmployeeProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_employee_day")
                    .table(AttendanceRecord::Table)
                    .col(AttendanceRecord::EmployeeId)
                    .col(AttendanceRecord::WorkDate)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_work_date")
                    .table(AttendanceRecord::Table)
                    .col(AttendanceRecord::WorkDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayrollLine::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PayrollLine::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PayrollLine::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(PayrollLine::Period).string_len(7).not_null())
                    .col(ColumnDef::new(PayrollLine::BasicPayCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollLine::AllowancesCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollLine::DeductionsCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollLine::TaxCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollLine::NetPayCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(PayrollLine::Status)
                            .string_len(16)
                            .not_null()
                            .default("DRAFT"),
                    )
                    .col(ColumnDef::new(PayrollLine::ProcessedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PayrollLine::Notes).text())
                    .col(ColumnDef::new(PayrollLine::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(PayrollLine::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payroll_employee")
                            .from(PayrollLine::Table, PayrollLine::EmployeeId)
                            .to(EmployeeProfile::Table, EmployeeProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_payroll_employee_period")
                    .table(PayrollLine::Table)
                    .col(PayrollLine::EmployeeId)
                    .col(PayrollLine::Period)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_payroll_period")
                    .table(PayrollLine::Table)
                    .col(PayrollLine::Period)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayrollLine::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AttendanceRecord::Table).to_owned())
            .await?;
        Ok(())
    }
}
