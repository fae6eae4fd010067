use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use entity::{
    attendance_record, department, employee_profile, payroll_line, performance_review,
    review_cycle, user_profile, user_secret,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde_json::json;
use uuid::Uuid;

use crate::attendance::{AttendancePolicy, AttendanceStatus};
use crate::auth::hash_password;

pub const ADMIN_EMAIL: &str = "admin@smartemployee360.test";
pub const HR_EMAIL: &str = "hr@smartemployee360.test";
pub const MANAGER_EMAIL: &str = "manager@smartemployee360.test";
pub const EMPLOYEE_EMAIL: &str = "john.smith@smartemployee360.test";
pub const REVIEW_CYCLE_NAME: &str = "Q4 2024 Performance Reviews";

const DEPARTMENTS: &[(&str, &str)] = &[
    ("Engineering", "San Francisco"),
    ("Marketing", "New York"),
    ("Sales", "Chicago"),
    ("Human Resources", "New York"),
    ("Finance", "Boston"),
];

struct StaffSeed {
    email: &'static str,
    password: Option<&'static str>,
    name: &'static str,
    phone: &'static str,
    role: user_profile::Role,
    code: &'static str,
    department: &'static str,
    designation: &'static str,
    employment_type: employee_profile::EmploymentType,
    status: employee_profile::Status,
    salary_cents: i64,
    hired: (i32, u32, u32),
    manager: Option<&'static str>,
    skills: &'static [&'static str],
}

const STAFF: &[StaffSeed] = &[
    StaffSeed {
        email: ADMIN_EMAIL,
        password: Some("admin123"),
        name: "System Administrator",
        phone: "+1-555-0100",
        role: user_profile::Role::Admin,
        code: "EMP100",
        department: "Human Resources",
        designation: "System Administrator",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Active,
        salary_cents: 9_600_000,
        hired: (2019, 3, 1),
        manager: None,
        skills: &["Administration", "Security"],
    },
    StaffSeed {
        email: HR_EMAIL,
        password: Some("hr123"),
        name: "Sarah Johnson",
        phone: "+1-555-0101",
        role: user_profile::Role::Hr,
        code: "EMP101",
        department: "Human Resources",
        designation: "HR Manager",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Active,
        salary_cents: 8_400_000,
        hired: (2020, 1, 15),
        manager: None,
        skills: &["Recruiting", "Employee Relations"],
    },
    StaffSeed {
        email: MANAGER_EMAIL,
        password: Some("manager123"),
        name: "Michael Chen",
        phone: "+1-555-0102",
        role: user_profile::Role::Manager,
        code: "EMP102",
        department: "Engineering",
        designation: "Engineering Manager",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Active,
        salary_cents: 12_000_000,
        hired: (2018, 6, 4),
        manager: None,
        skills: &["Leadership", "Rust", "Architecture"],
    },
    StaffSeed {
        email: EMPLOYEE_EMAIL,
        password: Some("employee123"),
        name: "John Smith",
        phone: "+1-555-0103",
        role: user_profile::Role::Employee,
        code: "EMP001",
        department: "Engineering",
        designation: "Senior Software Engineer",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Active,
        salary_cents: 9_000_000,
        hired: (2021, 2, 1),
        manager: Some(MANAGER_EMAIL),
        skills: &["Rust", "PostgreSQL"],
    },
    StaffSeed {
        email: "emily.davis@smartemployee360.test",
        password: None,
        name: "Emily Davis",
        phone: "+1-555-0104",
        role: user_profile::Role::Employee,
        code: "EMP002",
        department: "Marketing",
        designation: "Marketing Specialist",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Active,
        salary_cents: 6_600_000,
        hired: (2022, 4, 11),
        manager: None,
        skills: &["Content", "SEO"],
    },
    StaffSeed {
        email: "david.wilson@smartemployee360.test",
        password: None,
        name: "David Wilson",
        phone: "+1-555-0105",
        role: user_profile::Role::Employee,
        code: "EMP003",
        department: "Sales",
        designation: "Sales Associate",
        employment_type: employee_profile::EmploymentType::PartTime,
        status: employee_profile::Status::Active,
        salary_cents: 4_800_000,
        hired: (2023, 1, 9),
        manager: None,
        skills: &["Negotiation"],
    },
    StaffSeed {
        email: "lisa.anderson@smartemployee360.test",
        password: None,
        name: "Lisa Anderson",
        phone: "+1-555-0106",
        role: user_profile::Role::Employee,
        code: "EMP004",
        department: "Engineering",
        designation: "QA Engineer",
        employment_type: employee_profile::EmploymentType::Contract,
        status: employee_profile::Status::Active,
        salary_cents: 7_200_000,
        hired: (2023, 7, 17),
        manager: Some(MANAGER_EMAIL),
        skills: &["Testing", "Automation"],
    },
    StaffSeed {
        email: "robert.taylor@smartemployee360.test",
        password: None,
        name: "Robert Taylor",
        phone: "+1-555-0107",
        role: user_profile::Role::Employee,
        code: "EMP005",
        department: "Finance",
        designation: "Financial Analyst",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::OnLeave,
        salary_cents: 7_800_000,
        hired: (2021, 9, 20),
        manager: None,
        skills: &["Forecasting", "Excel"],
    },
    StaffSeed {
        email: "priya.patel@smartemployee360.test",
        password: None,
        name: "Priya Patel",
        phone: "+1-555-0108",
        role: user_profile::Role::Employee,
        code: "EMP006",
        department: "Engineering",
        designation: "Software Engineering Intern",
        employment_type: employee_profile::EmploymentType::Intern,
        status: employee_profile::Status::Active,
        salary_cents: 3_600_000,
        hired: (2024, 6, 3),
        manager: Some(MANAGER_EMAIL),
        skills: &["Python"],
    },
    StaffSeed {
        email: "james.brown@smartemployee360.test",
        password: None,
        name: "James Brown",
        phone: "+1-555-0109",
        role: user_profile::Role::Employee,
        code: "EMP007",
        department: "Sales",
        designation: "Account Executive",
        employment_type: employee_profile::EmploymentType::FullTime,
        status: employee_profile::Status::Inactive,
        salary_cents: 6_000_000,
        hired: (2020, 11, 2),
        manager: None,
        skills: &[],
    },
];

/// (employee code, date, check-in, check-out, requested status)
type AttendanceSeed = (
    &'static str,
    (i32, u32, u32),
    Option<(u32, u32)>,
    Option<(u32, u32)>,
    Option<AttendanceStatus>,
);

const ATTENDANCE: &[AttendanceSeed] = &[
    ("EMP001", (2025, 1, 15), Some((9, 15)), Some((17, 45)), None),
    ("EMP002", (2025, 1, 15), Some((9, 45)), Some((18, 0)), None),
    ("EMP003", (2025, 1, 15), Some((8, 55)), Some((13, 0)), None),
    ("EMP004", (2025, 1, 15), None, None, Some(AttendanceStatus::Absent)),
    ("EMP005", (2025, 1, 15), None, None, Some(AttendanceStatus::Leave)),
    ("EMP006", (2025, 1, 15), Some((9, 5)), Some((17, 5)), None),
    ("EMP102", (2025, 1, 15), Some((8, 30)), Some((18, 30)), None),
    ("EMP101", (2025, 1, 15), Some((9, 0)), Some((17, 30)), None),
    ("EMP002", (2025, 1, 13), Some((9, 50)), Some((18, 0)), None),
    ("EMP002", (2025, 1, 14), Some((9, 40)), Some((18, 0)), None),
    ("EMP003", (2025, 1, 14), Some((4, 30)), Some((17, 30)), None),
];

const DECEMBER_STATUSES: &[(&str, payroll_line::Status)] = &[
    ("EMP100", payroll_line::Status::Processed),
    ("EMP101", payroll_line::Status::Processed),
    ("EMP102", payroll_line::Status::Processed),
    ("EMP001", payroll_line::Status::Processed),
    ("EMP002", payroll_line::Status::Approved),
    ("EMP003", payroll_line::Status::Pending),
    ("EMP005", payroll_line::Status::Pending),
    ("EMP004", payroll_line::Status::Error),
    ("EMP006", payroll_line::Status::Draft),
];

/// (employee code, status, rating, summary)
const REVIEWS: &[(&str, performance_review::Status, Option<f64>, Option<&str>)] = &[
    (
        "EMP001",
        performance_review::Status::Completed,
        Some(4.5),
        Some("Led the payments migration and mentored two engineers."),
    ),
    (
        "EMP002",
        performance_review::Status::Completed,
        Some(4.0),
        Some("Campaign launches landed on schedule."),
    ),
    (
        "EMP006",
        performance_review::Status::Completed,
        Some(3.0),
        Some("Solid first internship term."),
    ),
    ("EMP003", performance_review::Status::InProgress, Some(3.5), None),
    ("EMP004", performance_review::Status::NotStarted, None, None),
    ("EMP005", performance_review::Status::NotStarted, None, None),
];

#[derive(Debug, Clone)]
pub struct SeededHrRecords {
    pub departments: Vec<department::Model>,
    pub users: Vec<user_profile::Model>,
    pub employees: Vec<employee_profile::Model>,
    pub cycle: review_cycle::Model,
}

impl SeededHrRecords {
    pub fn user_email(&self, email: &str) -> Option<&user_profile::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn employee_code(&self, code: &str) -> Option<&employee_profile::Model> {
        self.employees.iter().find(|e| e.employee_code == code)
    }

    pub fn department_named(&self, name: &str) -> Option<&department::Model> {
        self.departments.iter().find(|d| d.name == name)
    }
}

fn seed_err(message: impl Into<String>) -> DbErr {
    DbErr::Custom(message.into())
}

fn date((year, month, day): (i32, u32, u32)) -> Result<NaiveDate, DbErr> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| seed_err(format!("invalid seed date {year}-{month}-{day}")))
}

fn clock(time: Option<(u32, u32)>) -> Result<Option<NaiveTime>, DbErr> {
    time.map(|(h, m)| {
        NaiveTime::from_hms_opt(h, m, 0).ok_or_else(|| seed_err(format!("invalid seed time {h}:{m}")))
    })
    .transpose()
}

fn timestamp((year, month, day): (i32, u32, u32)) -> Result<DateTimeWithTimeZone, DbErr> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .map(Into::into)
        .ok_or_else(|| seed_err("invalid seed timestamp"))
}

async fn reload(db: &DatabaseConnection) -> Result<SeededHrRecords, DbErr> {
    let cycle = review_cycle::Entity::find()
        .filter(review_cycle::Column::Name.eq(REVIEW_CYCLE_NAME))
        .one(db)
        .await?
        .ok_or_else(|| seed_err("seed review cycle missing"))?;
    Ok(SeededHrRecords {
        departments: department::Entity::find()
            .order_by_asc(department::Column::Name)
            .all(db)
            .await?,
        users: user_profile::Entity::find()
            .order_by_asc(user_profile::Column::Email)
            .all(db)
            .await?,
        employees: employee_profile::Entity::find()
            .order_by_asc(employee_profile::Column::EmployeeCode)
            .all(db)
            .await?,
        cycle,
    })
}

/// Inserts the demo organisation; a second run returns the existing rows.
pub async fn seed_hr_demo(db: &DatabaseConnection) -> Result<SeededHrRecords, DbErr> {
    let already_seeded = user_profile::Entity::find()
        .filter(user_profile::Column::Email.eq(ADMIN_EMAIL))
        .one(db)
        .await?
        .is_some();
    if already_seeded {
        tracing::info!("demo data already present");
        return reload(db).await;
    }
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();

    let mut departments = Vec::with_capacity(DEPARTMENTS.len());
    for (name, location) in DEPARTMENTS {
        let model = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            location: Set(Some(location.to_string())),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
        departments.push(model);
    }

    let mut users: Vec<user_profile::Model> = Vec::with_capacity(STAFF.len());
    let mut employees: Vec<employee_profile::Model> = Vec::with_capacity(STAFF.len());
    for staff in STAFF {
        let user = user_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(staff.email.to_string()),
            full_name: Set(staff.name.to_string()),
            phone: Set(Some(staff.phone.to_string())),
            avatar_url: Set(None),
            role: Set(staff.role),
            is_active: Set(staff.status != employee_profile::Status::Inactive),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
        if let Some(password) = staff.password {
            user_secret::ActiveModel {
                user_id: Set(user.id),
                password_hash: Set(hash_password(password).map_err(|e| seed_err(e.to_string()))?),
                updated_at: Set(seeded_at),
            }
            .insert(db)
            .await?;
        }
        let department_id = departments
            .iter()
            .find(|d| d.name == staff.department)
            .map(|d| d.id);
        let manager_id = staff
            .manager
            .and_then(|email| users.iter().find(|u| u.email == email))
            .map(|u| u.id);
        let employee = employee_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            employee_code: Set(staff.code.to_string()),
            department_id: Set(department_id),
            designation: Set(staff.designation.to_string()),
            manager_id: Set(manager_id),
            hire_date: Set(date(staff.hired)?),
            salary_cents: Set(staff.salary_cents),
            gender: Set(None),
            date_of_birth: Set(None),
            address: Set(None),
            emergency_contact_name: Set(None),
            emergency_contact_phone: Set(None),
            employment_type: Set(staff.employment_type),
            status: Set(staff.status),
            location: Set(None),
            skills: Set(json!(staff.skills)),
            notes: Set(None),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
        users.push(user);
        employees.push(employee);
    }

    let by_code = |code: &str| -> Result<&employee_profile::Model, DbErr> {
        employees
            .iter()
            .find(|e| e.employee_code == code)
            .ok_or_else(|| seed_err(format!("unknown seed employee {code}")))
    };

    let policy = AttendancePolicy::default();
    for (code, day, check_in, check_out, requested) in ATTENDANCE {
        let employee = by_code(code)?;
        let (check_in, check_out) = (clock(*check_in)?, clock(*check_out)?);
        let outcome = policy
            .classify(*requested, check_in, check_out)
            .map_err(|e| seed_err(e.to_string()))?;
        attendance_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            work_date: Set(date(*day)?),
            check_in: Set(check_in),
            check_out: Set(check_out),
            status: Set(outcome.status.into()),
            late_marks: Set(outcome.late_marks),
            worked_minutes: Set(outcome.worked_minutes),
            notes: Set(None),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
    }

    let current: Vec<&employee_profile::Model> = employees
        .iter()
        .filter(|e| e.status != employee_profile::Status::Inactive)
        .collect();
    for employee in &current {
        insert_payroll_line(
            db,
            employee,
            "2024-11",
            payroll_line::Status::Processed,
            Some(timestamp((2024, 11, 30))?),
        )
        .await?;
    }
    for (code, status) in DECEMBER_STATUSES {
        let employee = by_code(code)?;
        let processed_at = if *status == payroll_line::Status::Processed {
            Some(timestamp((2024, 12, 31))?)
        } else {
            None
        };
        insert_payroll_line(db, employee, "2024-12", *status, processed_at).await?;
    }

    let cycle = review_cycle::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(REVIEW_CYCLE_NAME.to_string()),
        period_start: Set(date((2024, 10, 1))?),
        period_end: Set(date((2024, 12, 31))?),
        due_date: Set(date((2025, 1, 31))?),
        status: Set(review_cycle::Status::Active),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let engineering = departments
        .iter()
        .find(|d| d.name == "Engineering")
        .map(|d| d.id);
    let manager = users.iter().find(|u| u.email == MANAGER_EMAIL).map(|u| u.id);
    let hr = users.iter().find(|u| u.email == HR_EMAIL).map(|u| u.id);
    for (code, status, rating, summary) in REVIEWS {
        let employee = by_code(code)?;
        let reviewer = if employee.department_id == engineering {
            manager
        } else {
            hr
        };
        let submitted_at = if *status == performance_review::Status::Completed {
            Some(timestamp((2025, 1, 20))?)
        } else {
            None
        };
        performance_review::ActiveModel {
            id: Set(Uuid::new_v4()),
            cycle_id: Set(cycle.id),
            employee_id: Set(employee.id),
            reviewer_id: Set(reviewer),
            status: Set(*status),
            rating: Set(*rating),
            summary: Set(summary.map(str::to_string)),
            strengths: Set(None),
            improvements: Set(None),
            goals: Set(json!([])),
            submitted_at: Set(submitted_at),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
    }

    tracing::info!(
        departments = departments.len(),
        employees = employees.len(),
        "demo data seeded"
    );
    Ok(SeededHrRecords {
        departments,
        users,
        employees,
        cycle,
    })
}

async fn insert_payroll_line(
    db: &DatabaseConnection,
    employee: &employee_profile::Model,
    period: &str,
    status: payroll_line::Status,
    processed_at: Option<DateTimeWithTimeZone>,
) -> Result<payroll_line::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let basic = employee.salary_cents / 12;
    let allowances = basic / 10;
    let deductions = basic / 20;
    let tax = basic * 3 / 20;
    payroll_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employee.id),
        period: Set(period.to_string()),
        basic_pay_cents: Set(basic),
        allowances_cents: Set(allowances),
        deductions_cents: Set(deductions),
        tax_cents: Set(tax),
        net_pay_cents: Set(basic + allowances - deductions - tax),
        status: Set(status),
        processed_at: Set(processed_at),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}
