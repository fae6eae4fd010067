use std::collections::{BTreeMap, HashMap, HashSet};

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};
use entity::{attendance_record, employee_profile};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::employees::{load_directory, search_needle, DirectoryEntry, EmployeeStatus};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::page::PageArgs;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Leave,
    Holiday,
}

impl From<attendance_record::Status> for AttendanceStatus {
    fn from(value: attendance_record::Status) -> Self {
        match value {
            attendance_record::Status::Present => AttendanceStatus::Present,
            attendance_record::Status::Late => AttendanceStatus::Late,
            attendance_record::Status::Absent => AttendanceStatus::Absent,
            attendance_record::Status::Leave => AttendanceStatus::Leave,
            attendance_record::Status::Holiday => AttendanceStatus::Holiday,
        }
    }
}

impl From<AttendanceStatus> for attendance_record::Status {
    fn from(value: AttendanceStatus) -> Self {
        match value {
            AttendanceStatus::Present => attendance_record::Status::Present,
            AttendanceStatus::Late => attendance_record::Status::Late,
            AttendanceStatus::Absent => attendance_record::Status::Absent,
            AttendanceStatus::Leave => attendance_record::Status::Leave,
            AttendanceStatus::Holiday => attendance_record::Status::Holiday,
        }
    }
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Leave => "LEAVE",
            AttendanceStatus::Holiday => "HOLIDAY",
        }
    }

    fn is_off_day(self) -> bool {
        matches!(
            self,
            AttendanceStatus::Leave | AttendanceStatus::Absent | AttendanceStatus::Holiday
        )
    }
}

/// Shift start plus the grace window before a check-in counts as late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    pub shift_start: NaiveTime,
    pub grace_minutes: i64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            shift_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            grace_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOutcome {
    pub status: AttendanceStatus,
    pub late_marks: i32,
    pub worked_minutes: i32,
}

impl AttendancePolicy {
    pub fn late_after(&self) -> NaiveTime {
        self.shift_start + chrono::Duration::minutes(self.grace_minutes)
    }

    /// Derives status, lateness, and hours for one day.
    ///
    /// An explicit LEAVE, ABSENT, or HOLIDAY wins and carries no hours. Otherwise the
    /// check-in time decides between PRESENT and LATE; a requested PRESENT or LATE is
    /// kept only when there is no check-in to judge by.
    pub fn classify(
        &self,
        requested: Option<AttendanceStatus>,
        check_in: Option<NaiveTime>,
        check_out: Option<NaiveTime>,
    ) -> Result<DayOutcome, ValidationErrors> {
        if let (Some(start), Some(end)) = (check_in, check_out) {
            if end < start {
                return Err(ValidationErrors::single(
                    "checkOut",
                    "Check-out cannot be earlier than check-in",
                ));
            }
        }
        if let Some(status) = requested.filter(|s| s.is_off_day()) {
            return Ok(DayOutcome {
                status,
                late_marks: 0,
                worked_minutes: 0,
            });
        }
        let Some(start) = check_in else {
            let status = requested.unwrap_or(AttendanceStatus::Absent);
            return Ok(DayOutcome {
                status,
                late_marks: i32::from(status == AttendanceStatus::Late),
                worked_minutes: 0,
            });
        };
        let late = start > self.late_after();
        let worked_minutes = check_out
            .map(|end| (end - start).num_minutes() as i32)
            .unwrap_or(0);
        Ok(DayOutcome {
            status: if late {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            },
            late_marks: i32::from(late),
            worked_minutes,
        })
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceEntry {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
    pub work_date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub late_marks: i32,
    pub worked_minutes: i32,
    pub worked_hours: f64,
    pub notes: Option<String>,
}

fn entry_view(record: attendance_record::Model, who: &DirectoryEntry) -> AttendanceEntry {
    AttendanceEntry {
        id: record.id,
        employee_id: record.employee_id,
        employee_code: who.employee_code.clone(),
        employee_name: who.name.clone(),
        department: who.department.clone(),
        work_date: record.work_date,
        check_in: record.check_in,
        check_out: record.check_out,
        status: record.status.into(),
        late_marks: record.late_marks,
        worked_minutes: record.worked_minutes,
        worked_hours: round_to(record.worked_minutes as f64 / 60.0, 2),
        notes: record.notes,
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendancePage {
    pub total_count: i64,
    pub items: Vec<AttendanceEntry>,
}

#[derive(Clone, Debug, InputObject)]
pub struct AttendanceInput {
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct AttendanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub department_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub employee_id: Option<Uuid>,
    pub q: Option<String>,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AttendanceOrder {
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    HoursDesc,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceStats {
    pub date: NaiveDate,
    pub total_employees: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub on_leave: i64,
    pub unrecorded: i64,
    pub attendance_rate: f64,
    pub average_hours: f64,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnomalyKind {
    SuspiciousTiming,
    ExtendedHours,
    UnusualPattern,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceAnomaly {
    pub employee_id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub work_date: NaiveDate,
    pub kind: AnomalyKind,
    pub description: String,
    pub confidence: i32,
    pub recommendations: Vec<String>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

async fn ensure_employee(db: &DatabaseConnection, employee_id: Uuid) -> ApiResult<()> {
    if employee_profile::Entity::find_by_id(employee_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Employee"));
    }
    Ok(())
}

/// Inserts or replaces the record for an employee's work day.
pub async fn record_attendance(
    db: &DatabaseConnection,
    policy: &AttendancePolicy,
    input: AttendanceInput,
) -> ApiResult<AttendanceEntry> {
    let outcome = policy.classify(input.status, input.check_in, input.check_out)?;
    let span = info_span!(
        "hr.attendance.record",
        employee_id = %input.employee_id,
        work_date = %input.work_date,
        status = outcome.status.as_str()
    );
    async move {
        ensure_employee(db, input.employee_id).await?;
        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let now: DateTimeWithTimeZone = Utc::now().into();
        let existing = attendance_record::Entity::find()
            .filter(attendance_record::Column::EmployeeId.eq(input.employee_id))
            .filter(attendance_record::Column::WorkDate.eq(input.work_date))
            .one(db)
            .await?;
        let saved = match existing {
            Some(record) => {
                let mut active: attendance_record::ActiveModel = record.into();
                active.check_in = Set(input.check_in);
                active.check_out = Set(input.check_out);
                active.status = Set(outcome.status.into());
                active.late_marks = Set(outcome.late_marks);
                active.worked_minutes = Set(outcome.worked_minutes);
                active.notes = Set(notes);
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                attendance_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    employee_id: Set(input.employee_id),
                    work_date: Set(input.work_date),
                    check_in: Set(input.check_in),
                    check_out: Set(input.check_out),
                    status: Set(outcome.status.into()),
                    late_marks: Set(outcome.late_marks),
                    worked_minutes: Set(outcome.worked_minutes),
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
        Ok(entry_view(saved, who))
    }
    .instrument(span)
    .await
}

/// Applies one status to several records and returns how many were changed.
pub async fn bulk_set_attendance_status(
    db: &DatabaseConnection,
    policy: &AttendancePolicy,
    ids: Vec<Uuid>,
    status: AttendanceStatus,
) -> ApiResult<u64> {
    if ids.is_empty() {
        return Err(ApiError::invalid("ids", "At least one record is required"));
    }
    let span = info_span!(
        "hr.attendance.bulk_status",
        records = ids.len(),
        status = status.as_str()
    );
    async move {
        let txn = db.begin().await?;
        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::Id.is_in(ids))
            .all(&txn)
            .await?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut updated = 0u64;
        for record in records {
            let outcome = policy.classify(Some(status), record.check_in, record.check_out)?;
            let mut active: attendance_record::ActiveModel = record.into();
            active.status = Set(outcome.status.into());
            active.late_marks = Set(outcome.late_marks);
            active.worked_minutes = Set(outcome.worked_minutes);
            active.updated_at = Set(now);
            active.update(&txn).await?;
            updated += 1;
        }
        txn.commit().await?;
        Ok(updated)
    }
    .instrument(span)
    .await
}

fn sort_entries(entries: &mut [AttendanceEntry], order: AttendanceOrder) {
    entries.sort_by(|a, b| {
        let primary = match order {
            AttendanceOrder::DateDesc => b.work_date.cmp(&a.work_date),
            AttendanceOrder::DateAsc => a.work_date.cmp(&b.work_date),
            AttendanceOrder::NameAsc => a
                .employee_name
                .cmp(&b.employee_name)
                .then(b.work_date.cmp(&a.work_date)),
            AttendanceOrder::HoursDesc => b.worked_minutes.cmp(&a.worked_minutes),
        };
        primary
            .then_with(|| a.employee_name.cmp(&b.employee_name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub async fn list_attendance(
    db: &DatabaseConnection,
    filter: AttendanceFilter,
    order: AttendanceOrder,
    page: PageArgs,
) -> ApiResult<AttendancePage> {
    let span = info_span!(
        "hr.attendance.list",
        status = filter.status.map(|s| s.as_str()).unwrap_or(""),
        first = page.limit
    );
    async move {
        let mut query = attendance_record::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(attendance_record::Column::WorkDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(attendance_record::Column::WorkDate.lte(to));
        }
        if let Some(status) = filter.status {
            query = query.filter(
                attendance_record::Column::Status.eq(attendance_record::Status::from(status)),
            );
        }
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(attendance_record::Column::EmployeeId.eq(employee_id));
        }
        let records = query.all(db).await?;
        let directory = load_directory(db).await?;
        let needle = search_needle(&filter.q);
        let mut entries: Vec<AttendanceEntry> = records
            .into_iter()
            .filter_map(|record| {
                let who = directory.get(&record.employee_id)?;
                if filter.department_id.is_some() && who.department_id != filter.department_id {
                    return None;
                }
                if let Some(needle) = &needle {
                    if !who.matches(needle) {
                        return None;
                    }
                }
                Some(entry_view(record, who))
            })
            .collect();
        sort_entries(&mut entries, order);
        Ok(AttendancePage {
            total_count: entries.len() as i64,
            items: page.slice(entries),
        })
    }
    .instrument(span)
    .await
}

/// Summarizes one day's rows against the roster of employees expected at work.
pub fn summarize_day(
    date: NaiveDate,
    roster: &HashSet<Uuid>,
    records: &[attendance_record::Model],
) -> AttendanceStats {
    let mut stats = AttendanceStats {
        date,
        total_employees: roster.len() as i64,
        present: 0,
        late: 0,
        absent: 0,
        on_leave: 0,
        unrecorded: 0,
        attendance_rate: 0.0,
        average_hours: 0.0,
    };
    let mut recorded = HashSet::new();
    let mut worked = Vec::new();
    for record in records
        .iter()
        .filter(|r| r.work_date == date && roster.contains(&r.employee_id))
    {
        recorded.insert(record.employee_id);
        match AttendanceStatus::from(record.status) {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Late => {
                stats.present += 1;
                stats.late += 1;
            }
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Leave => stats.on_leave += 1,
            AttendanceStatus::Holiday => {}
        }
        if record.worked_minutes > 0 {
            worked.push(record.worked_minutes as f64 / 60.0);
        }
    }
    stats.unrecorded = stats.total_employees - recorded.len() as i64;
    if stats.total_employees > 0 {
        stats.attendance_rate =
            round_to(stats.present as f64 * 100.0 / stats.total_employees as f64, 1);
    }
    if !worked.is_empty() {
        stats.average_hours = round_to(worked.iter().sum::<f64>() / worked.len() as f64, 2);
    }
    stats
}

pub async fn attendance_stats(
    db: &DatabaseConnection,
    date: NaiveDate,
    department_id: Option<Uuid>,
) -> ApiResult<AttendanceStats> {
    let span = info_span!("hr.attendance.stats", %date);
    async move {
        let directory = load_directory(db).await?;
        let roster: HashSet<Uuid> = directory
            .values()
            .filter(|e| e.status != EmployeeStatus::Inactive)
            .filter(|e| department_id.is_none() || e.department_id == department_id)
            .map(|e| e.employee_id)
            .collect();
        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::WorkDate.eq(date))
            .all(db)
            .await?;
        Ok(summarize_day(date, &roster, &records))
    }
    .instrument(span)
    .await
}

const EARLIEST_PLAUSIBLE_CHECK_IN: (u32, u32) = (5, 0);
const LATEST_PLAUSIBLE_CHECK_IN: (u32, u32) = (22, 0);
const EXTENDED_DAY_MINUTES: i32 = 12 * 60;
const LATE_STREAK: usize = 3;

#[derive(Debug, Clone)]
pub struct AnomalyFinding {
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub kind: AnomalyKind,
    pub description: String,
    pub confidence: i32,
    pub recommendations: Vec<String>,
}

fn hm(pair: (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(pair.0, pair.1, 0).unwrap_or(NaiveTime::MIN)
}

/// The first Monday-to-Friday date after `date`.
fn next_working_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut next = date.checked_add_days(Days::new(1))?;
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next = next.checked_add_days(Days::new(1))?;
    }
    Some(next)
}

/// Rule-based scan over attendance rows.
///
/// Rows are grouped per employee and walked in date order; a late streak is
/// reported once, on the day it reaches the threshold, with confidence rising for
/// each further late day.
pub fn find_anomalies(records: &[attendance_record::Model]) -> Vec<AnomalyFinding> {
    let earliest = hm(EARLIEST_PLAUSIBLE_CHECK_IN);
    let latest = hm(LATEST_PLAUSIBLE_CHECK_IN);
    let mut findings = Vec::new();
    let mut per_employee: BTreeMap<Uuid, Vec<&attendance_record::Model>> = BTreeMap::new();
    for record in records {
        per_employee.entry(record.employee_id).or_default().push(record);
    }
    for (employee_id, mut days) in per_employee {
        days.sort_by_key(|r| r.work_date);
        let mut streak: Vec<NaiveDate> = Vec::new();
        for record in &days {
            if let Some(check_in) = record.check_in {
                if check_in < earliest || check_in > latest {
                    findings.push(AnomalyFinding {
                        employee_id,
                        work_date: record.work_date,
                        kind: AnomalyKind::SuspiciousTiming,
                        description: format!(
                            "Check-in recorded at {} is outside normal working hours",
                            check_in.format("%H:%M")
                        ),
                        confidence: 85,
                        recommendations: vec![
                            "Verify the check-in with the employee".into(),
                            "Review badge or device logs for this day".into(),
                        ],
                    });
                }
            }
            if record.worked_minutes > EXTENDED_DAY_MINUTES {
                let hours = record.worked_minutes as f64 / 60.0;
                findings.push(AnomalyFinding {
                    employee_id,
                    work_date: record.work_date,
                    kind: AnomalyKind::ExtendedHours,
                    description: format!("Worked {:.1} hours in a single day", hours),
                    confidence: (70 + (record.worked_minutes - EXTENDED_DAY_MINUTES) / 30).min(95),
                    recommendations: vec![
                        "Confirm the check-out time was recorded correctly".into(),
                        "Check workload and overtime approvals".into(),
                    ],
                });
            }
            if record.status == attendance_record::Status::Late {
                let follows = streak
                    .last()
                    .and_then(|last| next_working_day(*last))
                    .is_some_and(|next| record.work_date <= next);
                if !follows {
                    streak.clear();
                }
                streak.push(record.work_date);
                if streak.len() == LATE_STREAK {
                    findings.push(AnomalyFinding {
                        employee_id,
                        work_date: record.work_date,
                        kind: AnomalyKind::UnusualPattern,
                        description: format!(
                            "Late {} working days in a row since {}",
                            LATE_STREAK, streak[0]
                        ),
                        confidence: 60,
                        recommendations: vec![
                            "Schedule a check-in conversation".into(),
                            "Consider a flexible start time".into(),
                        ],
                    });
                } else if streak.len() > LATE_STREAK {
                    if let Some(last) = findings.iter_mut().rev().find(|f| {
                        f.employee_id == employee_id && f.kind == AnomalyKind::UnusualPattern
                    }) {
                        last.work_date = record.work_date;
                        last.confidence = (last.confidence + 10).min(95);
                        last.description = format!(
                            "Late {} working days in a row since {}",
                            streak.len(),
                            streak[0]
                        );
                    }
                }
            } else {
                streak.clear();
            }
        }
    }
    findings
}

pub async fn detect_anomalies(
    db: &DatabaseConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> ApiResult<Vec<AttendanceAnomaly>> {
    if from > to {
        return Err(ApiError::invalid("from", "from must not be after to"));
    }
    let span = info_span!("hr.attendance.anomalies", %from, %to);
    async move {
        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::WorkDate.gte(from))
            .filter(attendance_record::Column::WorkDate.lte(to))
            .order_by_asc(attendance_record::Column::WorkDate)
            .all(db)
            .await?;
        let directory: HashMap<Uuid, DirectoryEntry> = load_directory(db).await?;
        let mut anomalies: Vec<AttendanceAnomaly> = find_anomalies(&records)
            .into_iter()
            .filter_map(|finding| {
                let who = directory.get(&finding.employee_id)?;
                Some(AttendanceAnomaly {
                    employee_id: finding.employee_id,
                    employee_code: who.employee_code.clone(),
                    employee_name: who.name.clone(),
                    work_date: finding.work_date,
                    kind: finding.kind,
                    description: finding.description,
                    confidence: finding.confidence,
                    recommendations: finding.recommendations,
                })
            })
            .collect();
        anomalies.sort_by(|a, b| {
            b.work_date
                .cmp(&a.work_date)
                .then_with(|| a.employee_name.cmp(&b.employee_name))
                .then_with(|| (a.kind as u8).cmp(&(b.kind as u8)))
        });
        tracing::debug!(found = anomalies.len(), "attendance anomalies scanned");
        Ok(anomalies)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn record(
        employee_id: Uuid,
        day: u32,
        check_in: Option<NaiveTime>,
        status: attendance_record::Status,
        worked_minutes: i32,
    ) -> attendance_record::Model {
        let now: DateTimeWithTimeZone = Utc::now().into();
        attendance_record::Model {
            id: Uuid::new_v4(),
            employee_id,
            work_date: d(day),
            check_in,
            check_out: None,
            status,
            late_marks: 0,
            worked_minutes,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn grace_window_separates_present_from_late() {
        let policy = AttendancePolicy::default();
        let on_time = policy.classify(None, Some(t(9, 15)), Some(t(17, 45))).unwrap();
        assert_eq!(on_time.status, AttendanceStatus::Present);
        assert_eq!(on_time.late_marks, 0);
        assert_eq!(on_time.worked_minutes, 510);

        let late = policy.classify(None, Some(t(9, 45)), None).unwrap();
        assert_eq!(late.status, AttendanceStatus::Late);
        assert_eq!(late.late_marks, 1);
        assert_eq!(late.worked_minutes, 0);

        let boundary = policy.classify(None, Some(t(9, 30)), None).unwrap();
        assert_eq!(boundary.status, AttendanceStatus::Present);
    }

    #[test]
    fn requested_off_days_win_and_carry_no_hours() {
        let policy = AttendancePolicy::default();
        let leave = policy
            .classify(Some(AttendanceStatus::Leave), Some(t(9, 50)), Some(t(17, 0)))
            .unwrap();
        assert_eq!(
            leave,
            DayOutcome {
                status: AttendanceStatus::Leave,
                late_marks: 0,
                worked_minutes: 0
            }
        );
    }

    #[test]
    fn missing_check_in_means_absent_unless_marked() {
        let policy = AttendancePolicy::default();
        assert_eq!(
            policy.classify(None, None, None).unwrap().status,
            AttendanceStatus::Absent
        );
        assert_eq!(
            policy
                .classify(Some(AttendanceStatus::Present), None, None)
                .unwrap()
                .status,
            AttendanceStatus::Present
        );
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let policy = AttendancePolicy::default();
        let err = policy
            .classify(None, Some(t(10, 0)), Some(t(9, 0)))
            .unwrap_err();
        assert!(err.get("checkOut").is_some());
    }

    #[test]
    fn custom_shift_moves_the_threshold() {
        let policy = AttendancePolicy {
            shift_start: t(8, 0),
            grace_minutes: 10,
        };
        assert_eq!(
            policy.classify(None, Some(t(8, 15)), None).unwrap().status,
            AttendanceStatus::Late
        );
    }

    #[test]
    fn day_summary_counts_late_as_present() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let e = Uuid::new_v4();
        let roster: HashSet<Uuid> = [a, b, c, e].into_iter().collect();
        let records = vec![
            record(a, 15, Some(t(9, 0)), attendance_record::Status::Present, 480),
            record(b, 15, Some(t(9, 50)), attendance_record::Status::Late, 420),
            record(c, 15, None, attendance_record::Status::Leave, 0),
            record(Uuid::new_v4(), 15, None, attendance_record::Status::Absent, 0),
        ];
        let stats = summarize_day(d(15), &roster, &records);
        assert_eq!(stats.total_employees, 4);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.on_leave, 1);
        assert_eq!(stats.absent, 0);
        assert_eq!(stats.unrecorded, 1);
        assert_eq!(stats.attendance_rate, 50.0);
        assert_eq!(stats.average_hours, 7.5);
    }

    #[test]
    fn empty_roster_has_zero_rate() {
        let stats = summarize_day(d(15), &HashSet::new(), &[]);
        assert_eq!(stats.attendance_rate, 0.0);
        assert_eq!(stats.average_hours, 0.0);
    }

    #[test]
    fn anomaly_rules_fire_independently() {
        let early = Uuid::new_v4();
        let streaker = Uuid::new_v4();
        let records = vec![
            record(early, 10, Some(t(4, 30)), attendance_record::Status::Present, 780),
            record(streaker, 13, Some(t(9, 50)), attendance_record::Status::Late, 400),
            record(streaker, 14, Some(t(9, 40)), attendance_record::Status::Late, 400),
            record(streaker, 15, Some(t(9, 45)), attendance_record::Status::Late, 400),
            record(streaker, 16, Some(t(9, 55)), attendance_record::Status::Late, 400),
        ];
        let findings = find_anomalies(&records);
        let kinds: Vec<AnomalyKind> = findings
            .iter()
            .filter(|f| f.employee_id == early)
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![AnomalyKind::SuspiciousTiming, AnomalyKind::ExtendedHours]
        );
        let patterns: Vec<&AnomalyFinding> = findings
            .iter()
            .filter(|f| f.kind == AnomalyKind::UnusualPattern)
            .collect();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].work_date, d(16));
        assert_eq!(patterns[0].confidence, 70);
    }

    #[test]
    fn late_days_must_be_consecutive_working_days() {
        let id = Uuid::new_v4();
        let on = |date: (i32, u32, u32)| {
            let mut row = record(id, 1, Some(t(9, 50)), attendance_record::Status::Late, 400);
            row.work_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
            row
        };
        let monthly = vec![on((2025, 1, 6)), on((2025, 2, 3)), on((2025, 3, 3))];
        assert!(find_anomalies(&monthly).is_empty());

        let gap = vec![on((2025, 1, 13)), on((2025, 1, 14)), on((2025, 1, 16))];
        assert!(find_anomalies(&gap).is_empty());

        let over_weekend = vec![on((2025, 1, 9)), on((2025, 1, 10)), on((2025, 1, 13))];
        let findings = find_anomalies(&over_weekend);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, AnomalyKind::UnusualPattern);
        assert_eq!(findings[0].work_date, d(13));
        assert_eq!(
            findings[0].description,
            "Late 3 working days in a row since 2025-01-09"
        );
    }

    #[test]
    fn broken_streak_is_not_reported() {
        let id = Uuid::new_v4();
        let records = vec![
            record(id, 13, Some(t(9, 50)), attendance_record::Status::Late, 400),
            record(id, 14, Some(t(9, 0)), attendance_record::Status::Present, 480),
            record(id, 15, Some(t(9, 45)), attendance_record::Status::Late, 400),
            record(id, 16, Some(t(9, 55)), attendance_record::Status::Late, 400),
        ];
        assert!(find_anomalies(&records).is_empty());
    }
}
