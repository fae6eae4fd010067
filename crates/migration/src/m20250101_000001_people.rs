use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Department {
    Table,
    Id,
    Name,
    Location,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserProfile {
    Table,
    Id,
    Email,
    FullName,
    Phone,
    AvatarUrl,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserSecret {
    Table,
    UserId,
    PasswordHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmployeeProfile {
    Table,
    Id,
    UserId,
    EmployeeCode,
    DepartmentId,
    Designation,
    ManagerId,
    HireDate,
    SalaryCents,
    Gender,
    DateOfBirth,
    Address,
    EmergencyContactName,
    EmergencyContactPhone,
    EmploymentType,
    Status,
    Location,
    Skills,
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
                    .table(Department::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Department::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Department::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Department::Location).string_len(128))
                    .col(ColumnDef::new(Department::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Department::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_department_name")
                    .table(Department::Table)
                    .col(Department::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserProfile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserProfile::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(UserProfile::Email).string_len(320).not_null())
                    .col(ColumnDef::new(UserProfile::FullName).string_len(128).not_null())
                    .col(ColumnDef::new(UserProfile::Phone).string_len(64))
                    .col(ColumnDef::new(UserProfile::AvatarUrl).string_len(512))
                    .col(
                        ColumnDef::new(UserProfile::Role)
                            .string_len(16)
                            .not_null()
                            .default("EMPLOYEE"),
                    )
                    .col(
                        ColumnDef::new(UserProfile::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(UserProfile::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(UserProfile::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_user_profile_email")
                    .table(UserProfile::Table)
                    .col(UserProfile::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSecret::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserSecret::UserId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(UserSecret::PasswordHash).text().not_null())
                    .col(ColumnDef::new(UserSecret::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_secret_user")
                            .from(UserSecret::Table, UserSecret::UserId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmployeeProfile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EmployeeProfile::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(EmployeeProfile::UserId).uuid().not_null())
                    .col(ColumnDef::new(EmployeeProfile::EmployeeCode).string_len(32).not_null())
                    .col(ColumnDef::new(EmployeeProfile::DepartmentId).uuid())
                    .col(ColumnDef::new(EmployeeProfile::Designation).string_len(128).not_null())
                    .col(ColumnDef::new(EmployeeProfile::ManagerId).uuid())
                    .col(ColumnDef::new(EmployeeProfile::HireDate).date().not_null())
                    .col(
                        ColumnDef::new(EmployeeProfile::SalaryCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(EmployeeProfile::Gender).string_len(32))
                    .col(ColumnDef::new(EmployeeProfile::DateOfBirth).date())
                    .col(ColumnDef::new(EmployeeProfile::Address).text())
                    .col(ColumnDef::new(EmployeeProfile::EmergencyContactName).string_len(128))
                    .col(ColumnDef::new(EmployeeProfile::EmergencyContactPhone).string_len(64))
                    .col(
                        ColumnDef::new(EmployeeProfile::EmploymentType)
                            .string_len(16)
                            .not_null()
                            .default("FULL_TIME"),
                    )
                    .col(
                        ColumnDef::new(EmployeeProfile::Status)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(ColumnDef::new(EmployeeProfile::Location).string_len(128))
                    .col(ColumnDef::new(EmployeeProfile::Skills).json_binary().not_null())
                    .col(ColumnDef::new(EmployeeProfile::Notes).text())
                    .col(ColumnDef::new(EmployeeProfile::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(EmployeeProfile::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_profile_user")
                            .from(EmployeeProfile::Table, EmployeeProfile::UserId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_profile_department")
                            .from(EmployeeProfile::Table, EmployeeProfile::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_profile_manager")
                            .from(EmployeeProfile::Table, EmployeeProfile::ManagerId)
                            .to(UserProfile::Table, UserProfile::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_employee_profile_user", EmployeeProfile::UserId),
            ("idx_employee_profile_code", EmployeeProfile::EmployeeCode),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(EmployeeProfile::Table)
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }
        for (name, column) in [
            ("idx_employee_profile_department", EmployeeProfile::DepartmentId),
            ("idx_employee_profile_status", EmployeeProfile::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(EmployeeProfile::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmployeeProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSecret::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Department::Table).to_owned())
            .await?;
        Ok(())
    }
}
