use std::collections::HashMap;

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{employee_profile, payroll_line};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::employees::{load_directory, search_needle, DirectoryEntry, EmploymentType};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::page::PageArgs;

pub const DEFAULT_TREND_MONTHS: i32 = 6;
pub const MAX_TREND_MONTHS: i32 = 24;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PayrollStatus {
    Draft,
    Pending,
    Approved,
    Processed,
    Error,
}

impl From<payroll_line::Status> for PayrollStatus {
    fn from(value: payroll_line::Status) -> Self {
        match value {
            payroll_line::Status::Draft => PayrollStatus::Draft,
            payroll_line::Status::Pending => PayrollStatus::Pending,
            payroll_line::Status::Approved => PayrollStatus::Approved,
            payroll_line::Status::Processed => PayrollStatus::Processed,
            payroll_line::Status::Error => PayrollStatus::Error,
        }
    }
}

impl From<PayrollStatus> for payroll_line::Status {
    fn from(value: PayrollStatus) -> Self {
        match value {
            PayrollStatus::Draft => payroll_line::Status::Draft,
            PayrollStatus::Pending => payroll_line::Status::Pending,
            PayrollStatus::Approved => payroll_line::Status::Approved,
            PayrollStatus::Processed => payroll_line::Status::Processed,
            PayrollStatus::Error => payroll_line::Status::Error,
        }
    }
}

impl PayrollStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PayrollStatus::Draft => "DRAFT",
            PayrollStatus::Pending => "PENDING",
            PayrollStatus::Approved => "APPROVED",
            PayrollStatus::Processed => "PROCESSED",
            PayrollStatus::Error => "ERROR",
        }
    }

    /// Lines in these states may still have their amounts edited.
    pub fn is_editable(self) -> bool {
        matches!(
            self,
            PayrollStatus::Draft | PayrollStatus::Pending | PayrollStatus::Error
        )
    }

    pub fn can_transition_to(self, target: PayrollStatus) -> bool {
        use PayrollStatus::*;
        matches!(
            (self, target),
            (Draft, Pending)
                | (Pending, Approved)
                | (Pending, Error)
                | (Approved, Processed)
                | (Approved, Error)
                | (Error, Pending)
        )
    }
}

/// A `YYYY-MM` pay period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (year, month) = value.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.chars().all(|c| c.is_ascii_digit()) || !month.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The `count` periods ending at `self`, oldest first.
    pub fn trailing(self, count: usize) -> Vec<Self> {
        let mut periods = Vec::with_capacity(count);
        let mut cursor = self;
        for _ in 0..count {
            periods.push(cursor);
            cursor = cursor.previous();
        }
        periods.reverse();
        periods
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn parse_period(field: &str, value: &str) -> ApiResult<Period> {
    Period::parse(value)
        .ok_or_else(|| ApiError::invalid(field, "Period must use the YYYY-MM format"))
}

/// Ceiling on any single amount: ten billion in currency units.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayAmounts {
    pub basic_pay_cents: i64,
    pub allowances_cents: i64,
    pub deductions_cents: i64,
    pub tax_cents: i64,
}

impl PayAmounts {
    /// Net pay after deductions and tax, rejecting negative inputs or results.
    pub fn net(&self) -> Result<i64, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("basicPayCents", self.basic_pay_cents),
            ("allowancesCents", self.allowances_cents),
            ("deductionsCents", self.deductions_cents),
            ("taxCents", self.tax_cents),
        ] {
            if value < 0 {
                errors.add(field, "Amount must not be negative");
            } else if value > MAX_AMOUNT_CENTS {
                errors.add(field, "Amount is too large");
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        let net = self
            .basic_pay_cents
            .checked_add(self.allowances_cents)
            .and_then(|gross| gross.checked_sub(self.deductions_cents))
            .and_then(|gross| gross.checked_sub(self.tax_cents))
            .ok_or_else(|| ValidationErrors::single("netPayCents", "Net pay is out of range"))?;
        if net < 0 {
            return Err(ValidationErrors::single(
                "netPayCents",
                "Deductions and tax exceed gross pay",
            ));
        }
        Ok(net)
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PayrollLine {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
    pub employment_type: EmploymentType,
    pub period: String,
    pub basic_pay_cents: i64,
    pub allowances_cents: i64,
    pub deductions_cents: i64,
    pub tax_cents: i64,
    pub net_pay_cents: i64,
    pub status: PayrollStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

fn line_view(line: payroll_line::Model, who: &DirectoryEntry) -> PayrollLine {
    PayrollLine {
        id: line.id,
        employee_id: line.employee_id,
        employee_code: who.employee_code.clone(),
        employee_name: who.name.clone(),
        department: who.department.clone(),
        employment_type: who.employment_type,
        period: line.period,
        basic_pay_cents: line.basic_pay_cents,
        allowances_cents: line.allowances_cents,
        deductions_cents: line.deductions_cents,
        tax_cents: line.tax_cents,
        net_pay_cents: line.net_pay_cents,
        status: line.status.into(),
        processed_at: line.processed_at.map(|at| at.with_timezone(&Utc)),
        notes: line.notes,
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct PayrollLineInput {
    pub employee_id: Uuid,
    pub period: String,
    pub basic_pay_cents: i64,
    #[graphql(default)]
    pub allowances_cents: i64,
    #[graphql(default)]
    pub deductions_cents: i64,
    #[graphql(default)]
    pub tax_cents: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct PayrollFilter {
    pub department_id: Option<Uuid>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<PayrollStatus>,
    pub q: Option<String>,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PayrollOrder {
    #[default]
    NameAsc,
    NameDesc,
    NetPayDesc,
    NetPayAsc,
    BasicPayDesc,
    BasicPayAsc,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PayrollPage {
    pub total_count: i64,
    pub items: Vec<PayrollLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject)]
pub struct PayrollSummary {
    pub period: String,
    pub total_payroll_cents: i64,
    pub processed: i64,
    pub total_employees: i64,
    pub average_net_cents: i64,
    pub total_tax_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject)]
pub struct PayrollTrendPoint {
    pub period: String,
    pub total_net_cents: i64,
    pub total_tax_cents: i64,
    pub headcount: i64,
}

/// Creates or re-drafts the line for an employee's pay period.
pub async fn upsert_payroll_line(
    db: &DatabaseConnection,
    input: PayrollLineInput,
) -> ApiResult<PayrollLine> {
    let period = parse_period("period", &input.period)?.to_string();
    let amounts = PayAmounts {
        basic_pay_cents: input.basic_pay_cents,
        allowances_cents: input.allowances_cents,
        deductions_cents: input.deductions_cents,
        tax_cents: input.tax_cents,
    };
    let net = amounts.net()?;
    let span = info_span!(
        "hr.payroll.upsert",
        employee_id = %input.employee_id,
        period = period.as_str()
    );
    async move {
        if employee_profile::Entity::find_by_id(input.employee_id)
            .one(db)
            .await?
            .is_none()
        {
            return Err(ApiError::NotFound("Employee"));
        }
        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let now: DateTimeWithTimeZone = Utc::now().into();
        let existing = payroll_line::Entity::find()
            .filter(payroll_line::Column::EmployeeId.eq(input.employee_id))
            .filter(payroll_line::Column::Period.eq(period.clone()))
            .one(db)
            .await?;
        let saved = match existing {
            Some(line) => {
                let status = PayrollStatus::from(line.status);
                if !status.is_editable() {
                    return Err(ApiError::Conflict(format!(
                        "Payroll line for {} is {} and can no longer be edited",
                        period,
                        status.as_str()
                    )));
                }
                let mut active: payroll_line::ActiveModel = line.into();
                active.basic_pay_cents = Set(amounts.basic_pay_cents);
                active.allowances_cents = Set(amounts.allowances_cents);
                active.deductions_cents = Set(amounts.deductions_cents);
                active.tax_cents = Set(amounts.tax_cents);
                active.net_pay_cents = Set(net);
                active.status = Set(payroll_line::Status::Draft);
                active.processed_at = Set(None);
                active.notes = Set(notes);
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                payroll_line::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    employee_id: Set(input.employee_id),
                    period: Set(period.clone()),
                    basic_pay_cents: Set(amounts.basic_pay_cents),
                    allowances_cents: Set(amounts.allowances_cents),
                    deductions_cents: Set(amounts.deductions_cents),
                    tax_cents: Set(amounts.tax_cents),
                    net_pay_cents: Set(net),
                    status: Set(payroll_line::Status::Draft),
                    processed_at: Set(None),
                    notes: Set(notes),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?
            }
        };
        let directory = load_directory(db).await?;
        let who = directory
            .get(&saved.employee_id)
            .ok_or(ApiError::NotFound("Employee"))?;
        Ok(line_view(saved, who))
    }
    .instrument(span)
    .await
}

/// Moves every listed line to `target`, or none of them.
pub async fn transition_payroll(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
    target: PayrollStatus,
) -> ApiResult<Vec<PayrollLine>> {
    let mut ids = ids;
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Err(ApiError::invalid("ids", "At least one payroll line is required"));
    }
    let span = info_span!(
        "hr.payroll.transition",
        lines = ids.len(),
        target = target.as_str()
    );
    async move {
        let txn = db.begin().await?;
        let lines = payroll_line::Entity::find()
            .filter(payroll_line::Column::Id.is_in(ids.clone()))
            .all(&txn)
            .await?;
        if lines.len() != ids.len() {
            return Err(ApiError::NotFound("Payroll line"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut updated = Vec::with_capacity(lines.len());
        for line in lines {
            let current = PayrollStatus::from(line.status);
            if !current.can_transition_to(target) {
                return Err(ApiError::Conflict(format!(
                    "Payroll line {} ({}) cannot move from {} to {}",
                    line.id,
                    line.period,
                    current.as_str(),
                    target.as_str()
                )));
            }
            let mut active: payroll_line::ActiveModel = line.into();
            active.status = Set(target.into());
            if target == PayrollStatus::Processed {
                active.processed_at = Set(Some(now));
            }
            active.updated_at = Set(now);
            updated.push(active.update(&txn).await?);
        }
        txn.commit().await?;
        let directory = load_directory(db).await?;
        let mut views: Vec<PayrollLine> = updated
            .into_iter()
            .filter_map(|line| {
                let who = directory.get(&line.employee_id)?;
                Some(line_view(line, who))
            })
            .collect();
        sort_lines(&mut views, PayrollOrder::NameAsc);
        Ok(views)
    }
    .instrument(span)
    .await
}

fn sort_lines(lines: &mut [PayrollLine], order: PayrollOrder) {
    lines.sort_by(|a, b| {
        let primary = match order {
            PayrollOrder::NameAsc => a.employee_name.cmp(&b.employee_name),
            PayrollOrder::NameDesc => b.employee_name.cmp(&a.employee_name),
            PayrollOrder::NetPayDesc => b.net_pay_cents.cmp(&a.net_pay_cents),
            PayrollOrder::NetPayAsc => a.net_pay_cents.cmp(&b.net_pay_cents),
            PayrollOrder::BasicPayDesc => b.basic_pay_cents.cmp(&a.basic_pay_cents),
            PayrollOrder::BasicPayAsc => a.basic_pay_cents.cmp(&b.basic_pay_cents),
        };
        primary
            .then_with(|| a.employee_name.cmp(&b.employee_name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

async fn period_lines(
    db: &DatabaseConnection,
    period: &str,
    filter: &PayrollFilter,
) -> ApiResult<Vec<PayrollLine>> {
    let period = parse_period("period", period)?.to_string();
    let mut query = payroll_line::Entity::find().filter(payroll_line::Column::Period.eq(period));
    if let Some(status) = filter.status {
        query = query.filter(payroll_line::Column::Status.eq(payroll_line::Status::from(status)));
    }
    let lines = query.all(db).await?;
    let directory = load_directory(db).await?;
    let needle = search_needle(&filter.q);
    Ok(lines
        .into_iter()
        .filter_map(|line| {
            let who = directory.get(&line.employee_id)?;
            if filter.department_id.is_some() && who.department_id != filter.department_id {
                return None;
            }
            if filter.employment_type.is_some()
                && Some(who.employment_type) != filter.employment_type
            {
                return None;
            }
            if let Some(needle) = &needle {
                if !who.matches(needle) {
                    return None;
                }
            }
            Some(line_view(line, who))
        })
        .collect())
}

pub async fn list_payroll(
    db: &DatabaseConnection,
    period: &str,
    filter: PayrollFilter,
    order: PayrollOrder,
    page: PageArgs,
) -> ApiResult<PayrollPage> {
    let span = info_span!("hr.payroll.list", period, first = page.limit);
    async move {
        let mut lines = period_lines(db, period, &filter).await?;
        sort_lines(&mut lines, order);
        Ok(PayrollPage {
            total_count: lines.len() as i64,
            items: page.slice(lines),
        })
    }
    .instrument(span)
    .await
}

/// Totals over an already filtered set of lines.
pub fn summarize(period: &str, lines: &[PayrollLine]) -> PayrollSummary {
    let total_payroll_cents: i64 = lines.iter().map(|l| l.net_pay_cents).sum();
    let total_employees = lines.len() as i64;
    let average_net_cents = if total_employees == 0 {
        0
    } else {
        (total_payroll_cents as f64 / total_employees as f64).round() as i64
    };
    PayrollSummary {
        period: period.to_string(),
        total_payroll_cents,
        processed: lines
            .iter()
            .filter(|l| l.status == PayrollStatus::Processed)
            .count() as i64,
        total_employees,
        average_net_cents,
        total_tax_cents: lines.iter().map(|l| l.tax_cents).sum(),
    }
}

pub async fn payroll_summary(
    db: &DatabaseConnection,
    period: &str,
    filter: PayrollFilter,
) -> ApiResult<PayrollSummary> {
    let span = info_span!("hr.payroll.summary", period);
    async move {
        let lines = period_lines(db, period, &filter).await?;
        Ok(summarize(period.trim(), &lines))
    }
    .instrument(span)
    .await
}

pub async fn payroll_trend(
    db: &DatabaseConnection,
    until_period: &str,
    months: i32,
) -> ApiResult<Vec<PayrollTrendPoint>> {
    let until = parse_period("untilPeriod", until_period)?;
    if !(1..=MAX_TREND_MONTHS).contains(&months) {
        return Err(ApiError::invalid(
            "months",
            format!("months must be between 1 and {}", MAX_TREND_MONTHS),
        ));
    }
    let span = info_span!("hr.payroll.trend", until = %until, months);
    async move {
        let periods = until.trailing(months as usize);
        let keys: Vec<String> = periods.iter().map(Period::to_string).collect();
        let lines = payroll_line::Entity::find()
            .filter(payroll_line::Column::Period.is_in(keys.clone()))
            .all(db)
            .await?;
        let mut totals: HashMap<String, PayrollTrendPoint> = keys
            .iter()
            .map(|key| {
                (
                    key.clone(),
                    PayrollTrendPoint {
                        period: key.clone(),
                        total_net_cents: 0,
                        total_tax_cents: 0,
                        headcount: 0,
                    },
                )
            })
            .collect();
        for line in lines {
            if let Some(point) = totals.get_mut(&line.period) {
                point.total_net_cents += line.net_pay_cents;
                point.total_tax_cents += line.tax_cents;
                point.headcount += 1;
            }
        }
        Ok(keys
            .iter()
            .filter_map(|key| totals.remove(key))
            .collect())
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_pay_subtracts_deductions_and_tax() {
        let amounts = PayAmounts {
            basic_pay_cents: 750_000,
            allowances_cents: 75_000,
            deductions_cents: 37_500,
            tax_cents: 112_500,
        };
        assert_eq!(amounts.net().unwrap(), 675_000);
    }

    #[test]
    fn negative_amounts_and_net_are_rejected() {
        let negative = PayAmounts {
            basic_pay_cents: -1,
            allowances_cents: 0,
            deductions_cents: -5,
            tax_cents: 0,
        };
        let errors = negative.net().unwrap_err();
        assert!(errors.get("basicPayCents").is_some());
        assert!(errors.get("deductionsCents").is_some());

        let underwater = PayAmounts {
            basic_pay_cents: 100,
            allowances_cents: 0,
            deductions_cents: 80,
            tax_cents: 40,
        };
        assert!(underwater.net().unwrap_err().get("netPayCents").is_some());
    }

    #[test]
    fn oversized_amounts_are_rejected_without_overflow() {
        let huge = PayAmounts {
            basic_pay_cents: i64::MAX,
            allowances_cents: 1,
            deductions_cents: 0,
            tax_cents: 0,
        };
        let errors = huge.net().unwrap_err();
        assert_eq!(errors.get("basicPayCents"), Some("Amount is too large"));
        assert!(errors.get("allowancesCents").is_none());

        let ceiling = PayAmounts {
            basic_pay_cents: MAX_AMOUNT_CENTS,
            allowances_cents: MAX_AMOUNT_CENTS,
            deductions_cents: 0,
            tax_cents: MAX_AMOUNT_CENTS,
        };
        assert_eq!(ceiling.net().unwrap(), MAX_AMOUNT_CENTS);
    }

    #[test]
    fn state_machine_only_allows_listed_moves() {
        use PayrollStatus::*;
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Processed));
        assert!(Error.can_transition_to(Pending));
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Processed.can_transition_to(Error));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.is_editable());
        assert!(Error.is_editable());
    }

    #[test]
    fn periods_parse_and_walk_backwards() {
        assert_eq!(Period::parse("2024-12"), Some(Period { year: 2024, month: 12 }));
        assert_eq!(Period::parse("2024-13"), None);
        assert_eq!(Period::parse("2024-1"), None);
        assert_eq!(Period::parse("24-01"), None);
        let keys: Vec<String> = Period { year: 2025, month: 2 }
            .trailing(3)
            .iter()
            .map(Period::to_string)
            .collect();
        assert_eq!(keys, vec!["2024-12", "2025-01", "2025-02"]);
    }

    fn line(net: i64, tax: i64, status: PayrollStatus) -> PayrollLine {
        PayrollLine {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            employee_code: "EMP".into(),
            employee_name: "Someone".into(),
            department: "Engineering".into(),
            employment_type: EmploymentType::FullTime,
            period: "2024-12".into(),
            basic_pay_cents: net + tax,
            allowances_cents: 0,
            deductions_cents: 0,
            tax_cents: tax,
            net_pay_cents: net,
            status,
            processed_at: None,
            notes: None,
        }
    }

    #[test]
    fn summary_rounds_average_and_handles_empty_periods() {
        let lines = vec![
            line(100, 10, PayrollStatus::Processed),
            line(101, 20, PayrollStatus::Pending),
            line(100, 30, PayrollStatus::Processed),
        ];
        let summary = summarize("2024-12", &lines);
        assert_eq!(summary.total_payroll_cents, 301);
        assert_eq!(summary.average_net_cents, 100);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.total_tax_cents, 60);
        assert_eq!(summarize("2024-12", &[]).average_net_cents, 0);
    }

    #[test]
    fn sorting_breaks_ties_by_name() {
        let mut a = line(500, 0, PayrollStatus::Draft);
        a.employee_name = "Zed".into();
        let mut b = line(500, 0, PayrollStatus::Draft);
        b.employee_name = "Amy".into();
        let mut c = line(900, 0, PayrollStatus::Draft);
        c.employee_name = "Max".into();
        let mut lines = vec![a, b, c];
        sort_lines(&mut lines, PayrollOrder::NetPayDesc);
        let names: Vec<&str> = lines.iter().map(|l| l.employee_name.as_str()).collect();
        assert_eq!(names, vec!["Max", "Amy", "Zed"]);
    }
}
