use std::collections::{BTreeMap, HashMap, HashSet};

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{department, employee_profile, user_profile, user_secret};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select, TransactionTrait,
};
use serde_json::json;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::auth::{hash_password, normalize_email, UserRole};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::page::PageArgs;

pub const NOT_ASSIGNED: &str = "Not Assigned";
pub const NOT_SPECIFIED: &str = "Not Specified";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

impl From<employee_profile::Status> for EmployeeStatus {
    fn from(value: employee_profile::Status) -> Self {
        match value {
            employee_profile::Status::Active => EmployeeStatus::Active,
            employee_profile::Status::Inactive => EmployeeStatus::Inactive,
            employee_profile::Status::OnLeave => EmployeeStatus::OnLeave,
            employee_profile::Status::Terminated => EmployeeStatus::Terminated,
        }
    }
}

impl From<EmployeeStatus> for employee_profile::Status {
    fn from(value: EmployeeStatus) -> Self {
        match value {
            EmployeeStatus::Active => employee_profile::Status::Active,
            EmployeeStatus::Inactive => employee_profile::Status::Inactive,
            EmployeeStatus::OnLeave => employee_profile::Status::OnLeave,
            EmployeeStatus::Terminated => employee_profile::Status::Terminated,
        }
    }
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "ACTIVE",
            EmployeeStatus::Inactive => "INACTIVE",
            EmployeeStatus::OnLeave => "ON_LEAVE",
            EmployeeStatus::Terminated => "TERMINATED",
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Intern,
}

impl From<employee_profile::EmploymentType> for EmploymentType {
    fn from(value: employee_profile::EmploymentType) -> Self {
        match value {
            employee_profile::EmploymentType::FullTime => EmploymentType::FullTime,
            employee_profile::EmploymentType::PartTime => EmploymentType::PartTime,
            employee_profile::EmploymentType::Contract => EmploymentType::Contract,
            employee_profile::EmploymentType::Intern => EmploymentType::Intern,
        }
    }
}

impl From<EmploymentType> for employee_profile::EmploymentType {
    fn from(value: EmploymentType) -> Self {
        match value {
            EmploymentType::FullTime => employee_profile::EmploymentType::FullTime,
            EmploymentType::PartTime => employee_profile::EmploymentType::PartTime,
            EmploymentType::Contract => employee_profile::EmploymentType::Contract,
            EmploymentType::Intern => employee_profile::EmploymentType::Intern,
        }
    }
}

impl EmploymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "FULL_TIME",
            EmploymentType::PartTime => "PART_TIME",
            EmploymentType::Contract => "CONTRACT",
            EmploymentType::Intern => "INTERN",
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum EmployeeOrder {
    #[default]
    NameAsc,
    NameDesc,
    HireDateDesc,
    SalaryDesc,
    EmployeeCodeAsc,
}

impl EmployeeOrder {
    fn as_str(self) -> &'static str {
        match self {
            EmployeeOrder::NameAsc => "NAME_ASC",
            EmployeeOrder::NameDesc => "NAME_DESC",
            EmployeeOrder::HireDateDesc => "HIRE_DATE_DESC",
            EmployeeOrder::SalaryDesc => "SALARY_DESC",
            EmployeeOrder::EmployeeCodeAsc => "EMPLOYEE_CODE_ASC",
        }
    }
}

/// Flattened employee row the dashboard renders.
#[derive(Clone, Debug, SimpleObject)]
pub struct Employee {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub department_id: Option<Uuid>,
    pub department: String,
    pub designation: String,
    pub manager_id: Option<Uuid>,
    pub manager: String,
    pub location: String,
    pub hire_date: NaiveDate,
    pub salary_cents: i64,
    pub employment_type: EmploymentType,
    pub status: EmployeeStatus,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub skills: Vec<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeePage {
    pub total_count: i64,
    pub items: Vec<Employee>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
}

impl From<department::Model> for Department {
    fn from(model: department::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject)]
pub struct CountBucket {
    pub label: String,
    pub count: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub on_leave: i64,
    pub by_department: Vec<CountBucket>,
    pub by_employment_type: Vec<CountBucket>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct EmployeeFilter {
    pub department_id: Option<Uuid>,
    pub status: Option<EmployeeStatus>,
    pub employment_type: Option<EmploymentType>,
    pub location: Option<String>,
    pub hired_after: Option<NaiveDate>,
    pub hired_before: Option<NaiveDate>,
    pub q: Option<String>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct NewEmployeeInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub employee_code: String,
    pub department_id: Option<Uuid>,
    pub designation: String,
    pub location: String,
    pub employment_type: Option<EmploymentType>,
    pub hire_date: Option<NaiveDate>,
    pub salary_cents: Option<i64>,
    pub status: Option<EmployeeStatus>,
    pub role: Option<UserRole>,
    pub manager_id: Option<Uuid>,
    /// Omit to create a profile without a login.
    pub password: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Partial update; absent fields stay as they are.
#[derive(Clone, Debug, Default, InputObject)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<UserRole>,
    pub employee_code: Option<String>,
    pub department_id: Option<Uuid>,
    pub designation: Option<String>,
    pub manager_id: Option<Uuid>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<EmployeeStatus>,
    pub hire_date: Option<NaiveDate>,
    pub salary_cents: Option<i64>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Loose `something@host.tld` check with no whitespace anywhere.
pub fn is_valid_email(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    match domain.rsplit_once('.') {
        Some((host, tld)) => !local.is_empty() && !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn required_text(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{} is required", label));
    }
    trimmed.to_string()
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct ValidatedEmployee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub employee_code: String,
    pub department_id: Uuid,
    pub designation: String,
    pub location: String,
    pub employment_type: EmploymentType,
    pub hire_date: NaiveDate,
    pub salary_cents: i64,
}

/// Checks every required field of a new employee and reports all problems at once.
pub fn validate_new_employee(
    input: &NewEmployeeInput,
) -> Result<ValidatedEmployee, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = required_text(&mut errors, "name", "Name", &input.name);
    let email = normalize_email(&input.email);
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&email) {
        errors.add("email", "Email is invalid");
    }
    let phone = required_text(&mut errors, "phone", "Phone", &input.phone);
    let employee_code = required_text(
        &mut errors,
        "employeeCode",
        "Employee ID",
        &input.employee_code,
    );
    let designation = required_text(
        &mut errors,
        "designation",
        "Designation",
        &input.designation,
    );
    let location = required_text(&mut errors, "location", "Location", &input.location);
    if input.department_id.is_none() {
        errors.add("departmentId", "Department is required");
    }
    if input.employment_type.is_none() {
        errors.add("employmentType", "Employment type is required");
    }
    if input.hire_date.is_none() {
        errors.add("hireDate", "Hire date is required");
    }
    match input.salary_cents {
        None => errors.add("salaryCents", "Salary is required"),
        Some(cents) if cents < 0 => errors.add("salaryCents", "Salary must not be negative"),
        Some(_) => {}
    }
    if let Some(password) = &input.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
    }
    match (
        input.department_id,
        input.employment_type,
        input.hire_date,
        input.salary_cents,
    ) {
        (Some(department_id), Some(employment_type), Some(hire_date), Some(salary_cents))
            if errors.is_empty() =>
        {
            Ok(ValidatedEmployee {
                name,
                email,
                phone,
                employee_code,
                department_id,
                designation,
                location,
                employment_type,
                hire_date,
                salary_cents,
            })
        }
        _ => Err(errors),
    }
}

fn validate_patch(patch: &EmployeePatch) -> ApiResult<()> {
    let mut errors = ValidationErrors::new();
    let non_empty = [
        ("name", "Name", &patch.name),
        ("phone", "Phone", &patch.phone),
        ("employeeCode", "Employee ID", &patch.employee_code),
        ("designation", "Designation", &patch.designation),
        ("location", "Location", &patch.location),
    ];
    for (field, label, value) in non_empty {
        if let Some(value) = value {
            required_text(&mut errors, field, label, value);
        }
    }
    if let Some(email) = &patch.email {
        if !is_valid_email(&normalize_email(email)) {
            errors.add("email", "Email is invalid");
        }
    }
    if matches!(patch.salary_cents, Some(cents) if cents < 0) {
        errors.add("salaryCents", "Salary must not be negative");
    }
    errors.into_result()
}

fn skills_from_json(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn skills_to_json(skills: Vec<String>) -> serde_json::Value {
    let cleaned: Vec<String> = skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    json!(cleaned)
}

fn to_utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn employee_view(
    profile: employee_profile::Model,
    user: user_profile::Model,
    departments: &HashMap<Uuid, department::Model>,
    managers: &HashMap<Uuid, String>,
) -> Employee {
    let department = profile
        .department_id
        .and_then(|id| departments.get(&id));
    let location = profile
        .location
        .clone()
        .filter(|l| !l.trim().is_empty())
        .or_else(|| department.and_then(|d| d.location.clone()))
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let manager = profile
        .manager_id
        .and_then(|id| managers.get(&id).cloned())
        .unwrap_or_else(|| NOT_ASSIGNED.to_string());
    Employee {
        id: profile.id,
        user_id: user.id,
        employee_code: profile.employee_code,
        name: user.full_name,
        email: user.email,
        phone: user.phone,
        avatar_url: user.avatar_url,
        role: user.role.into(),
        department_id: profile.department_id,
        department: department
            .map(|d| d.name.clone())
            .unwrap_or_else(|| NOT_ASSIGNED.to_string()),
        designation: profile.designation,
        manager_id: profile.manager_id,
        manager,
        location,
        hire_date: profile.hire_date,
        salary_cents: profile.salary_cents,
        employment_type: profile.employment_type.into(),
        status: profile.status.into(),
        gender: profile.gender,
        date_of_birth: profile.date_of_birth,
        address: profile.address,
        emergency_contact_name: profile.emergency_contact_name,
        emergency_contact_phone: profile.emergency_contact_phone,
        skills: skills_from_json(&profile.skills),
        notes: profile.notes,
        updated_at: to_utc(profile.updated_at.max(user.updated_at)),
    }
}

async fn assemble_employees<C: ConnectionTrait>(
    db: &C,
    rows: Vec<(employee_profile::Model, Option<user_profile::Model>)>,
) -> ApiResult<Vec<Employee>> {
    let department_ids: HashSet<Uuid> = rows.iter().filter_map(|(p, _)| p.department_id).collect();
    let manager_ids: HashSet<Uuid> = rows.iter().filter_map(|(p, _)| p.manager_id).collect();
    let departments = if department_ids.is_empty() {
        HashMap::new()
    } else {
        department::Entity::find()
            .filter(department::Column::Id.is_in(department_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect()
    };
    let managers: HashMap<Uuid, String> = if manager_ids.is_empty() {
        HashMap::new()
    } else {
        user_profile::Entity::find()
            .filter(user_profile::Column::Id.is_in(manager_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name))
            .collect()
    };
    Ok(rows
        .into_iter()
        .filter_map(|(profile, user)| {
            user.map(|user| employee_view(profile, user, &departments, &managers))
        })
        .collect())
}

/// `%needle%` with LIKE metacharacters escaped by `\`.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn lowered_contains(column: impl IntoColumnRef, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(contains_pattern(needle)).escape('\\'))
}

fn filtered_query(filter: &EmployeeFilter) -> Select<employee_profile::Entity> {
    let mut query = employee_profile::Entity::find()
        .join(JoinType::InnerJoin, employee_profile::Relation::UserProfile.def());
    query = match filter.status {
        Some(status) => query.filter(
            employee_profile::Column::Status.eq(employee_profile::Status::from(status)),
        ),
        None => query.filter(employee_profile::Column::Status.ne(employee_profile::Status::Inactive)),
    };
    if let Some(department_id) = filter.department_id {
        query = query.filter(employee_profile::Column::DepartmentId.eq(department_id));
    }
    if let Some(kind) = filter.employment_type {
        query = query.filter(
            employee_profile::Column::EmploymentType
                .eq(employee_profile::EmploymentType::from(kind)),
        );
    }
    if let Some(after) = filter.hired_after {
        query = query.filter(employee_profile::Column::HireDate.gte(after));
    }
    if let Some(before) = filter.hired_before {
        query = query.filter(employee_profile::Column::HireDate.lte(before));
    }
    if let Some(location) = optional_text(filter.location.clone()) {
        query = query.filter(lowered_contains(
            (employee_profile::Entity, employee_profile::Column::Location),
            &location,
        ));
    }
    if let Some(q) = optional_text(filter.q.clone()) {
        query = query.filter(
            Condition::any()
                .add(lowered_contains(
                    (user_profile::Entity, user_profile::Column::FullName),
                    &q,
                ))
                .add(lowered_contains(
                    (user_profile::Entity, user_profile::Column::Email),
                    &q,
                ))
                .add(lowered_contains(
                    (employee_profile::Entity, employee_profile::Column::EmployeeCode),
                    &q,
                )),
        );
    }
    query
}

fn apply_order(
    query: Select<employee_profile::Entity>,
    order: EmployeeOrder,
) -> Select<employee_profile::Entity> {
    let query = match order {
        EmployeeOrder::NameAsc => query.order_by_asc(user_profile::Column::FullName),
        EmployeeOrder::NameDesc => query.order_by_desc(user_profile::Column::FullName),
        EmployeeOrder::HireDateDesc => query.order_by_desc(employee_profile::Column::HireDate),
        EmployeeOrder::SalaryDesc => query.order_by_desc(employee_profile::Column::SalaryCents),
        EmployeeOrder::EmployeeCodeAsc => {
            query.order_by_asc(employee_profile::Column::EmployeeCode)
        }
    };
    query.order_by_asc(employee_profile::Column::Id)
}

pub async fn list_employees(
    db: &DatabaseConnection,
    filter: EmployeeFilter,
    order: EmployeeOrder,
    page: PageArgs,
) -> ApiResult<EmployeePage> {
    let span = info_span!(
        "hr.employees.list",
        status = filter.status.map(|s| s.as_str()).unwrap_or(""),
        has_q = filter.q.as_deref().map(|q| !q.trim().is_empty()).unwrap_or(false),
        order = order.as_str(),
        first = page.limit
    );
    async move {
        let base = filtered_query(&filter);
        let total_count = base.clone().count(db).await?;
        let rows = apply_order(base, order)
            .select_also(user_profile::Entity)
            .limit(page.limit)
            .offset(page.offset)
            .all(db)
            .await?;
        let items = assemble_employees(db, rows).await?;
        Ok(EmployeePage {
            total_count: total_count as i64,
            items,
        })
    }
    .instrument(span)
    .await
}

pub async fn get_employee<C: ConnectionTrait>(db: &C, id: Uuid) -> ApiResult<Option<Employee>> {
    let row = employee_profile::Entity::find_by_id(id)
        .find_also_related(user_profile::Entity)
        .one(db)
        .await?;
    Ok(assemble_employees(db, row.into_iter().collect())
        .await?
        .into_iter()
        .next())
}

pub async fn get_employee_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> ApiResult<Option<Employee>> {
    let row = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(user_id))
        .find_also_related(user_profile::Entity)
        .one(db)
        .await?;
    Ok(assemble_employees(db, row.into_iter().collect())
        .await?
        .into_iter()
        .next())
}

pub async fn list_departments(db: &DatabaseConnection) -> ApiResult<Vec<Department>> {
    let rows = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Department::from).collect())
}

pub async fn create_department(
    db: &DatabaseConnection,
    name: &str,
    location: Option<String>,
) -> ApiResult<Department> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("name", "Department name is required"));
    }
    if name.chars().count() > 120 {
        return Err(ApiError::invalid(
            "name",
            "Department name must be at most 120 characters",
        ));
    }
    // Case folding happens here rather than in SQL: SQLite's lower() only
    // folds ASCII.
    let folded = name.to_lowercase();
    let existing: Vec<String> = department::Entity::find()
        .select_only()
        .column(department::Column::Name)
        .into_tuple()
        .all(db)
        .await?;
    if existing.iter().any(|other| other.to_lowercase() == folded) {
        return Err(ApiError::Conflict(format!(
            "Department {} already exists",
            name
        )));
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        location: Set(optional_text(location)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    tracing::info!(department_id = %model.id, "department created");
    Ok(model.into())
}

async fn ensure_email_free<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    let mut query = user_profile::Entity::find().filter(user_profile::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user_profile::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists".into(),
        ));
    }
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    let mut query = employee_profile::Entity::find()
        .filter(employee_profile::Column::EmployeeCode.eq(code));
    if let Some(id) = except {
        query = query.filter(employee_profile::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Employee ID {} is already in use",
            code
        )));
    }
    Ok(())
}

async fn ensure_department<C: ConnectionTrait>(db: &C, id: Uuid) -> ApiResult<()> {
    if department::Entity::find_by_id(id).one(db).await?.is_none() {
        return Err(ApiError::invalid("departmentId", "Department not found"));
    }
    Ok(())
}

async fn ensure_manager<C: ConnectionTrait>(db: &C, id: Uuid) -> ApiResult<()> {
    if user_profile::Entity::find_by_id(id).one(db).await?.is_none() {
        return Err(ApiError::invalid("managerId", "Manager not found"));
    }
    Ok(())
}

pub async fn create_employee(
    db: &DatabaseConnection,
    input: NewEmployeeInput,
) -> ApiResult<Employee> {
    let valid = validate_new_employee(&input)?;
    let span = info_span!(
        "hr.employees.create",
        employee_code = valid.employee_code.as_str(),
        with_login = input.password.is_some()
    );
    async move {
        let password_hash = match &input.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };
        let txn = db.begin().await?;
        ensure_email_free(&txn, &valid.email, None).await?;
        ensure_code_free(&txn, &valid.employee_code, None).await?;
        ensure_department(&txn, valid.department_id).await?;
        if let Some(manager_id) = input.manager_id {
            ensure_manager(&txn, manager_id).await?;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let user_id = Uuid::new_v4();
        user_profile::ActiveModel {
            id: Set(user_id),
            email: Set(valid.email.clone()),
            full_name: Set(valid.name.clone()),
            phone: Set(Some(valid.phone.clone())),
            avatar_url: Set(None),
            role: Set(input.role.unwrap_or(UserRole::Employee).into()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        if let Some(password_hash) = password_hash {
            user_secret::ActiveModel {
                user_id: Set(user_id),
                password_hash: Set(password_hash),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        let employee_id = Uuid::new_v4();
        employee_profile::ActiveModel {
            id: Set(employee_id),
            user_id: Set(user_id),
            employee_code: Set(valid.employee_code.clone()),
            department_id: Set(Some(valid.department_id)),
            designation: Set(valid.designation.clone()),
            manager_id: Set(input.manager_id),
            hire_date: Set(valid.hire_date),
            salary_cents: Set(valid.salary_cents),
            gender: Set(optional_text(input.gender.clone())),
            date_of_birth: Set(input.date_of_birth),
            address: Set(optional_text(input.address.clone())),
            emergency_contact_name: Set(optional_text(input.emergency_contact_name.clone())),
            emergency_contact_phone: Set(optional_text(input.emergency_contact_phone.clone())),
            employment_type: Set(valid.employment_type.into()),
            status: Set(input.status.unwrap_or(EmployeeStatus::Active).into()),
            location: Set(Some(valid.location.clone())),
            skills: Set(skills_to_json(input.skills.clone().unwrap_or_default())),
            notes: Set(optional_text(input.notes.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        tracing::info!(%employee_id, %user_id, "employee created");

        get_employee(db, employee_id)
            .await?
            .ok_or_else(|| ApiError::internal(anyhow::anyhow!("created employee vanished")))
    }
    .instrument(span)
    .await
}

/// Updates both profiles of the employee owning `user_id`.
pub async fn update_employee(
    db: &DatabaseConnection,
    user_id: Uuid,
    patch: EmployeePatch,
) -> ApiResult<Employee> {
    validate_patch(&patch)?;
    let span = info_span!("hr.employees.update", %user_id);
    async move {
        let txn = db.begin().await?;
        let (profile, user) = employee_profile::Entity::find()
            .filter(employee_profile::Column::UserId.eq(user_id))
            .find_also_related(user_profile::Entity)
            .one(&txn)
            .await?
            .and_then(|(profile, user)| user.map(|user| (profile, user)))
            .ok_or(ApiError::NotFound("Employee"))?;

        let email = patch.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            ensure_email_free(&txn, email, Some(user.id)).await?;
        }
        let code = patch.employee_code.as_deref().map(|c| c.trim().to_string());
        if let Some(code) = &code {
            ensure_code_free(&txn, code, Some(profile.id)).await?;
        }
        if let Some(department_id) = patch.department_id {
            ensure_department(&txn, department_id).await?;
        }
        if let Some(manager_id) = patch.manager_id {
            if manager_id == user_id {
                return Err(ApiError::invalid(
                    "managerId",
                    "An employee cannot manage themselves",
                ));
            }
            ensure_manager(&txn, manager_id).await?;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut user_active: user_profile::ActiveModel = user.into();
        if let Some(name) = &patch.name {
            user_active.full_name = Set(name.trim().to_string());
        }
        if let Some(email) = email {
            user_active.email = Set(email);
        }
        if let Some(phone) = &patch.phone {
            user_active.phone = Set(Some(phone.trim().to_string()));
        }
        if let Some(avatar_url) = patch.avatar_url.clone() {
            user_active.avatar_url = Set(optional_text(Some(avatar_url)));
        }
        if let Some(role) = patch.role {
            user_active.role = Set(role.into());
        }
        user_active.updated_at = Set(now);
        user_active.update(&txn).await?;

        let employee_id = profile.id;
        let mut active: employee_profile::ActiveModel = profile.into();
        if let Some(code) = code {
            active.employee_code = Set(code);
        }
        if let Some(department_id) = patch.department_id {
            active.department_id = Set(Some(department_id));
        }
        if let Some(designation) = &patch.designation {
            active.designation = Set(designation.trim().to_string());
        }
        if let Some(manager_id) = patch.manager_id {
            active.manager_id = Set(Some(manager_id));
        }
        if let Some(location) = &patch.location {
            active.location = Set(Some(location.trim().to_string()));
        }
        if let Some(kind) = patch.employment_type {
            active.employment_type = Set(kind.into());
        }
        if let Some(status) = patch.status {
            active.status = Set(status.into());
        }
        if let Some(hire_date) = patch.hire_date {
            active.hire_date = Set(hire_date);
        }
        if let Some(salary_cents) = patch.salary_cents {
            active.salary_cents = Set(salary_cents);
        }
        if let Some(gender) = patch.gender.clone() {
            active.gender = Set(optional_text(Some(gender)));
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }
        if let Some(address) = patch.address.clone() {
            active.address = Set(optional_text(Some(address)));
        }
        if let Some(name) = patch.emergency_contact_name.clone() {
            active.emergency_contact_name = Set(optional_text(Some(name)));
        }
        if let Some(phone) = patch.emergency_contact_phone.clone() {
            active.emergency_contact_phone = Set(optional_text(Some(phone)));
        }
        if let Some(skills) = patch.skills.clone() {
            active.skills = Set(skills_to_json(skills));
        }
        if let Some(notes) = patch.notes.clone() {
            active.notes = Set(optional_text(Some(notes)));
        }
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;

        get_employee(db, employee_id)
            .await?
            .ok_or(ApiError::NotFound("Employee"))
    }
    .instrument(span)
    .await
}

/// Soft delete: the row stays, the status becomes INACTIVE.
pub async fn deactivate_employee(db: &DatabaseConnection, user_id: Uuid) -> ApiResult<Employee> {
    let profile = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("Employee"))?;
    let employee_id = profile.id;
    if profile.status != employee_profile::Status::Inactive {
        let mut active: employee_profile::ActiveModel = profile.into();
        active.status = Set(employee_profile::Status::Inactive);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        tracing::info!(%employee_id, "employee deactivated");
    }
    get_employee(db, employee_id)
        .await?
        .ok_or(ApiError::NotFound("Employee"))
}

fn buckets(counts: BTreeMap<String, i64>) -> Vec<CountBucket> {
    counts
        .into_iter()
        .map(|(label, count)| CountBucket { label, count })
        .collect()
}

pub async fn employee_stats(db: &DatabaseConnection) -> ApiResult<EmployeeStats> {
    let profiles = employee_profile::Entity::find().all(db).await?;
    let departments: HashMap<Uuid, String> = department::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    let mut stats = EmployeeStats {
        total: profiles.len() as i64,
        active: 0,
        inactive: 0,
        on_leave: 0,
        by_department: Vec::new(),
        by_employment_type: Vec::new(),
    };
    let mut by_department = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    for profile in &profiles {
        match profile.status {
            employee_profile::Status::Active => stats.active += 1,
            employee_profile::Status::Inactive => stats.inactive += 1,
            employee_profile::Status::OnLeave => stats.on_leave += 1,
            employee_profile::Status::Terminated => {}
        }
        let department = profile
            .department_id
            .and_then(|id| departments.get(&id).cloned())
            .unwrap_or_else(|| NOT_ASSIGNED.to_string());
        *by_department.entry(department).or_insert(0) += 1;
        let kind = EmploymentType::from(profile.employment_type).as_str().to_string();
        *by_type.entry(kind).or_insert(0) += 1;
    }
    stats.by_department = buckets(by_department);
    stats.by_employment_type = buckets(by_type);
    Ok(stats)
}

/// Compact per-employee facts the attendance, payroll, and review views join against.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub employee_id: Uuid,
    pub user_id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub department: String,
    pub designation: String,
    pub employment_type: EmploymentType,
    pub status: EmployeeStatus,
    pub manager_id: Option<Uuid>,
}

impl DirectoryEntry {
    /// Case-insensitive match on name or employee code.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.employee_code.to_lowercase().contains(needle)
    }
}

pub async fn load_directory<C: ConnectionTrait>(db: &C) -> ApiResult<HashMap<Uuid, DirectoryEntry>> {
    let departments: HashMap<Uuid, String> = department::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    let rows = employee_profile::Entity::find()
        .find_also_related(user_profile::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(profile, user)| {
            let user = user?;
            let department = profile
                .department_id
                .and_then(|id| departments.get(&id).cloned())
                .unwrap_or_else(|| NOT_ASSIGNED.to_string());
            Some((
                profile.id,
                DirectoryEntry {
                    employee_id: profile.id,
                    user_id: user.id,
                    employee_code: profile.employee_code,
                    name: user.full_name,
                    department_id: profile.department_id,
                    department,
                    designation: profile.designation,
                    employment_type: profile.employment_type.into(),
                    status: profile.status.into(),
                    manager_id: profile.manager_id,
                },
            ))
        })
        .collect())
}

/// Normalizes a free-text search term to its lowercase needle.
pub fn search_needle(q: &Option<String>) -> Option<String> {
    optional_text(q.clone()).map(|q| q.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> NewEmployeeInput {
        NewEmployeeInput {
            name: "  Ada Lovelace ".into(),
            email: "Ada@Example.test".into(),
            phone: "+1 555 0100".into(),
            employee_code: "EMP900".into(),
            department_id: Some(Uuid::new_v4()),
            designation: "Analyst".into(),
            location: "London".into(),
            employment_type: Some(EmploymentType::FullTime),
            hire_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            salary_cents: Some(9_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn email_shape_matches_loose_pattern() {
        assert!(is_valid_email("john.smith@smartemployee360.test"));
        assert!(!is_valid_email("john.smith@localhost"));
        assert!(!is_valid_email("@example.test"));
        assert!(!is_valid_email("john smith@example.test"));
        assert!(!is_valid_email("john@.test"));
    }

    #[test]
    fn search_patterns_escape_like_wildcards() {
        assert_eq!(contains_pattern("Smith"), "%smith%");
        assert_eq!(contains_pattern("R_D"), "%r\\_d%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn valid_input_is_trimmed_and_normalized() {
        let valid = validate_new_employee(&complete_input()).unwrap();
        assert_eq!(valid.name, "Ada Lovelace");
        assert_eq!(valid.email, "ada@example.test");
        assert_eq!(valid.employment_type, EmploymentType::FullTime);
    }

    #[test]
    fn every_missing_field_is_reported_together() {
        let errors = validate_new_employee(&NewEmployeeInput::default()).unwrap_err();
        for field in [
            "name",
            "email",
            "phone",
            "employeeCode",
            "departmentId",
            "designation",
            "location",
            "employmentType",
            "hireDate",
            "salaryCents",
        ] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn negative_salary_and_short_password_are_rejected() {
        let input = NewEmployeeInput {
            salary_cents: Some(-1),
            password: Some("short".into()),
            ..complete_input()
        };
        let errors = validate_new_employee(&input).unwrap_err();
        assert_eq!(errors.get("salaryCents"), Some("Salary must not be negative"));
        assert!(errors.get("password").is_some());
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn patch_rejects_blank_required_fields() {
        let patch = EmployeePatch {
            name: Some("   ".into()),
            email: Some("nope".into()),
            ..Default::default()
        };
        let err = validate_patch(&patch).unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert!(validate_patch(&EmployeePatch::default()).is_ok());
    }

    #[test]
    fn skills_are_cleaned_before_storage() {
        let stored = skills_to_json(vec![" Rust ".into(), "".into(), "SQL".into()]);
        assert_eq!(skills_from_json(&stored), vec!["Rust", "SQL"]);
        assert!(skills_from_json(&json!({"not": "a list"})).is_empty());
    }
}
