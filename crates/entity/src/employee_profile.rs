use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "employee_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub employee_code: String,
    #[sea_orm(indexed)]
    pub department_id: Option<Uuid>,
    pub designation: String,
    pub manager_id: Option<Uuid>,
    pub hire_date: Date,
    pub salary_cents: i64,
    pub gender: Option<String>,
    pub date_of_birth: Option<Date>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub employment_type: EmploymentType,
    #[sea_orm(indexed)]
    pub status: Status,
    pub location: Option<String>,
    /// JSON array of skill labels.
    pub skills: Json,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    UserProfile,
    Department,
    Manager,
    Attendance,
    Payroll,
    Review,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::UserProfile => Entity::belongs_to(super::user_profile::Entity)
                .from(Column::UserId)
                .to(super::user_profile::Column::Id)
                .into(),
            Self::Department => Entity::belongs_to(super::department::Entity)
                .from(Column::DepartmentId)
                .to(super::department::Column::Id)
                .into(),
            Self::Manager => Entity::belongs_to(super::user_profile::Entity)
                .from(Column::ManagerId)
                .to(super::user_profile::Column::Id)
                .into(),
            Self::Attendance => Entity::has_many(super::attendance_record::Entity).into(),
            Self::Payroll => Entity::has_many(super::payroll_line::Entity).into(),
            Self::Review => Entity::has_many(super::performance_review::Entity).into(),
        }
    }
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProfile.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl Related<super::payroll_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payroll.def()
    }
}

impl Related<super::performance_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum EmploymentType {
    #[sea_orm(string_value = "FULL_TIME")]
    FullTime,
    #[sea_orm(string_value = "PART_TIME")]
    PartTime,
    #[sea_orm(string_value = "CONTRACT")]
    Contract,
    #[sea_orm(string_value = "INTERN")]
    Intern,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Status {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
    #[sea_orm(string_value = "ON_LEAVE")]
    OnLeave,
    #[sea_orm(string_value = "TERMINATED")]
    Terminated,
}

impl ActiveModelBehavior for ActiveModel {}
