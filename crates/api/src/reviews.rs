use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{performance_review, review_cycle, user_profile};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde_json::json;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::employees::{load_directory, search_needle, DirectoryEntry, EmployeeStatus};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::page::PageArgs;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleStatus {
    Upcoming,
    Active,
    Completed,
}

impl From<review_cycle::Status> for CycleStatus {
    fn from(value: review_cycle::Status) -> Self {
        match value {
            review_cycle::Status::Upcoming => CycleStatus::Upcoming,
            review_cycle::Status::Active => CycleStatus::Active,
            review_cycle::Status::Completed => CycleStatus::Completed,
        }
    }
}

impl From<CycleStatus> for review_cycle::Status {
    fn from(value: CycleStatus) -> Self {
        match value {
            CycleStatus::Upcoming => review_cycle::Status::Upcoming,
            CycleStatus::Active => review_cycle::Status::Active,
            CycleStatus::Completed => review_cycle::Status::Completed,
        }
    }
}

impl CycleStatus {
    fn rank(self) -> u8 {
        match self {
            CycleStatus::Upcoming => 0,
            CycleStatus::Active => 1,
            CycleStatus::Completed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Upcoming => "UPCOMING",
            CycleStatus::Active => "ACTIVE",
            CycleStatus::Completed => "COMPLETED",
        }
    }
}

/// Review state as shown to users; OVERDUE is derived from the cycle due date.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReviewStatus {
    NotStarted,
    InProgress,
    Completed,
    Overdue,
}

pub fn effective_status(
    stored: performance_review::Status,
    due_date: NaiveDate,
    today: NaiveDate,
) -> ReviewStatus {
    match stored {
        performance_review::Status::Completed => ReviewStatus::Completed,
        _ if today > due_date => ReviewStatus::Overdue,
        performance_review::Status::NotStarted => ReviewStatus::NotStarted,
        performance_review::Status::InProgress => ReviewStatus::InProgress,
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ReviewCycle {
    pub id: Uuid,
    pub name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub status: CycleStatus,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
}

fn cycle_view(
    cycle: review_cycle::Model,
    reviews: &[performance_review::Model],
    today: NaiveDate,
) -> ReviewCycle {
    let mut view = ReviewCycle {
        id: cycle.id,
        name: cycle.name,
        period_start: cycle.period_start,
        period_end: cycle.period_end,
        due_date: cycle.due_date,
        status: cycle.status.into(),
        total: 0,
        completed: 0,
        pending: 0,
        overdue: 0,
    };
    for review in reviews.iter().filter(|r| r.cycle_id == view.id) {
        view.total += 1;
        match effective_status(review.status, view.due_date, today) {
            ReviewStatus::Completed => view.completed += 1,
            ReviewStatus::Overdue => view.overdue += 1,
            ReviewStatus::NotStarted | ReviewStatus::InProgress => view.pending += 1,
        }
    }
    view
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PerformanceReview {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub employee_id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
    pub designation: String,
    pub reviewer_id: Option<Uuid>,
    pub reviewer_name: Option<String>,
    pub status: ReviewStatus,
    pub rating: Option<f64>,
    pub summary: Option<String>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub goals: Vec<String>,
    pub due_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
}

fn review_view(
    review: performance_review::Model,
    who: &DirectoryEntry,
    reviewers: &HashMap<Uuid, String>,
    due_date: NaiveDate,
    today: NaiveDate,
) -> PerformanceReview {
    PerformanceReview {
        id: review.id,
        cycle_id: review.cycle_id,
        employee_id: review.employee_id,
        employee_code: who.employee_code.clone(),
        employee_name: who.name.clone(),
        department: who.department.clone(),
        designation: who.designation.clone(),
        reviewer_id: review.reviewer_id,
        reviewer_name: review
            .reviewer_id
            .and_then(|id| reviewers.get(&id).cloned()),
        status: effective_status(review.status, due_date, today),
        rating: review.rating,
        summary: review.summary,
        strengths: review.strengths,
        improvements: review.improvements,
        goals: serde_json::from_value(review.goals).unwrap_or_default(),
        due_date,
        submitted_at: review.submitted_at.map(|at| at.with_timezone(&Utc)),
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ReviewPage {
    pub total_count: i64,
    pub items: Vec<PerformanceReview>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewCycleInput {
    pub name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub department_id: Option<Uuid>,
    pub q: Option<String>,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ReviewOrder {
    #[default]
    NameAsc,
    RatingDesc,
    RatingAsc,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct ReviewDraftInput {
    pub rating: Option<f64>,
    pub summary: Option<String>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub goals: Option<Vec<String>>,
}

#[derive(Clone, Debug, InputObject)]
pub struct ReviewSubmissionInput {
    pub rating: f64,
    pub summary: String,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub goals: Option<Vec<String>>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LaunchCycleResult {
    pub created: i64,
    pub cycle: ReviewCycle,
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PerformanceMetrics {
    pub cycle_id: Uuid,
    pub average_rating: Option<f64>,
    pub completion_rate: f64,
    pub rated: i64,
    pub distribution: Vec<RatingBucket>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_rating(errors: &mut ValidationErrors, rating: f64) {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        errors.add("rating", "Rating must be between 1 and 5");
    }
}

fn goals_json(goals: Vec<String>) -> serde_json::Value {
    let cleaned: Vec<String> = goals
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    json!(cleaned)
}

async fn find_cycle(db: &DatabaseConnection, id: Uuid) -> ApiResult<review_cycle::Model> {
    review_cycle::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("Review cycle"))
}

async fn cycle_with_counts(
    db: &DatabaseConnection,
    cycle: review_cycle::Model,
    today: NaiveDate,
) -> ApiResult<ReviewCycle> {
    let reviews = performance_review::Entity::find()
        .filter(performance_review::Column::CycleId.eq(cycle.id))
        .all(db)
        .await?;
    Ok(cycle_view(cycle, &reviews, today))
}

pub async fn create_cycle(
    db: &DatabaseConnection,
    input: NewCycleInput,
    today: NaiveDate,
) -> ApiResult<ReviewCycle> {
    let mut errors = ValidationErrors::new();
    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "Cycle name is required");
    }
    if input.period_start > input.period_end {
        errors.add("periodEnd", "Period end must not be before period start");
    }
    if input.period_end > input.due_date {
        errors.add("dueDate", "Due date must not be before period end");
    }
    errors.into_result()?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let cycle = review_cycle::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        period_start: Set(input.period_start),
        period_end: Set(input.period_end),
        due_date: Set(input.due_date),
        status: Set(review_cycle::Status::Upcoming),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    tracing::info!(cycle_id = %cycle.id, "review cycle created");
    Ok(cycle_view(cycle, &[], today))
}

/// Moves a cycle forward; setting the current status again is a no-op.
pub async fn set_cycle_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: CycleStatus,
    today: NaiveDate,
) -> ApiResult<ReviewCycle> {
    let cycle = find_cycle(db, id).await?;
    let current = CycleStatus::from(cycle.status);
    if status.rank() < current.rank() {
        return Err(ApiError::Conflict(format!(
            "Review cycle cannot move back from {} to {}",
            current.as_str(),
            status.as_str()
        )));
    }
    let cycle = if status == current {
        cycle
    } else {
        let mut active: review_cycle::ActiveModel = cycle.into();
        active.status = Set(status.into());
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?
    };
    cycle_with_counts(db, cycle, today).await
}

/// Opens reviews for every current employee missing one in this cycle.
pub async fn launch_cycle(
    db: &DatabaseConnection,
    id: Uuid,
    today: NaiveDate,
) -> ApiResult<LaunchCycleResult> {
    let span = info_span!("hr.reviews.launch", cycle_id = %id);
    async move {
        let cycle = find_cycle(db, id).await?;
        if cycle.status == review_cycle::Status::Completed {
            return Err(ApiError::Conflict(
                "Completed review cycles cannot be launched".into(),
            ));
        }
        let directory = load_directory(db).await?;
        let txn = db.begin().await?;
        let reviewed: HashSet<Uuid> = performance_review::Entity::find()
            .filter(performance_review::Column::CycleId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.employee_id)
            .collect();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut pending: Vec<&DirectoryEntry> = directory
            .values()
            .filter(|e| e.status != EmployeeStatus::Inactive)
            .filter(|e| !reviewed.contains(&e.employee_id))
            .collect();
        pending.sort_by(|a, b| a.employee_code.cmp(&b.employee_code));
        for employee in &pending {
            performance_review::ActiveModel {
                id: Set(Uuid::new_v4()),
                cycle_id: Set(id),
                employee_id: Set(employee.employee_id),
                reviewer_id: Set(employee.manager_id),
                status: Set(performance_review::Status::NotStarted),
                rating: Set(None),
                summary: Set(None),
                strengths: Set(None),
                improvements: Set(None),
                goals: Set(json!([])),
                submitted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        let cycle = if cycle.status == review_cycle::Status::Upcoming {
            let mut active: review_cycle::ActiveModel = cycle.into();
            active.status = Set(review_cycle::Status::Active);
            active.updated_at = Set(now);
            active.update(&txn).await?
        } else {
            cycle
        };
        txn.commit().await?;
        tracing::info!(created = pending.len(), "review cycle launched");
        Ok(LaunchCycleResult {
            created: pending.len() as i64,
            cycle: cycle_with_counts(db, cycle, today).await?,
        })
    }
    .instrument(span)
    .await
}

pub async fn list_cycles(db: &DatabaseConnection, today: NaiveDate) -> ApiResult<Vec<ReviewCycle>> {
    let cycles = review_cycle::Entity::find()
        .order_by_desc(review_cycle::Column::PeriodStart)
        .order_by_asc(review_cycle::Column::Name)
        .all(db)
        .await?;
    let reviews = performance_review::Entity::find().all(db).await?;
    Ok(cycles
        .into_iter()
        .map(|cycle| cycle_view(cycle, &reviews, today))
        .collect())
}

async fn reviewer_names(
    db: &DatabaseConnection,
    reviews: &[performance_review::Model],
) -> ApiResult<HashMap<Uuid, String>> {
    let ids: HashSet<Uuid> = reviews.iter().filter_map(|r| r.reviewer_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user_profile::Entity::find()
        .filter(user_profile::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name))
        .collect())
}

/// Rating order with unrated rows always last.
fn compare_ratings(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_reviews(reviews: &mut [PerformanceReview], order: ReviewOrder) {
    reviews.sort_by(|a, b| {
        let primary = match order {
            ReviewOrder::NameAsc => Ordering::Equal,
            ReviewOrder::RatingDesc => compare_ratings(a.rating, b.rating, true),
            ReviewOrder::RatingAsc => compare_ratings(a.rating, b.rating, false),
        };
        primary
            .then_with(|| a.employee_name.cmp(&b.employee_name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub async fn list_reviews(
    db: &DatabaseConnection,
    cycle_id: Uuid,
    filter: ReviewFilter,
    order: ReviewOrder,
    page: PageArgs,
    today: NaiveDate,
) -> ApiResult<ReviewPage> {
    let span = info_span!("hr.reviews.list", %cycle_id, first = page.limit);
    async move {
        let cycle = find_cycle(db, cycle_id).await?;
        let reviews = performance_review::Entity::find()
            .filter(performance_review::Column::CycleId.eq(cycle_id))
            .all(db)
            .await?;
        let reviewers = reviewer_names(db, &reviews).await?;
        let directory = load_directory(db).await?;
        let needle = search_needle(&filter.q);
        let mut items: Vec<PerformanceReview> = reviews
            .into_iter()
            .filter_map(|review| {
                let who = directory.get(&review.employee_id)?;
                if filter.department_id.is_some() && who.department_id != filter.department_id {
                    return None;
                }
                if let Some(needle) = &needle {
                    if !who.matches(needle) {
                        return None;
                    }
                }
                Some(review_view(review, who, &reviewers, cycle.due_date, today))
            })
            .filter(|view| filter.status.map_or(true, |s| view.status == s))
            .collect();
        sort_reviews(&mut items, order);
        Ok(ReviewPage {
            total_count: items.len() as i64,
            items: page.slice(items),
        })
    }
    .instrument(span)
    .await
}

async fn load_review_view(
    db: &DatabaseConnection,
    review: performance_review::Model,
    today: NaiveDate,
) -> ApiResult<PerformanceReview> {
    let cycle = find_cycle(db, review.cycle_id).await?;
    let reviewers = reviewer_names(db, std::slice::from_ref(&review)).await?;
    let directory = load_directory(db).await?;
    let who = directory
        .get(&review.employee_id)
        .ok_or(ApiError::NotFound("Employee"))?;
    Ok(review_view(review, who, &reviewers, cycle.due_date, today))
}

async fn open_review(db: &DatabaseConnection, id: Uuid) -> ApiResult<performance_review::Model> {
    let review = performance_review::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("Review"))?;
    if review.status == performance_review::Status::Completed {
        return Err(ApiError::Conflict(
            "Review has already been submitted".into(),
        ));
    }
    Ok(review)
}

/// Stores a draft and marks the review in progress.
pub async fn save_review(
    db: &DatabaseConnection,
    id: Uuid,
    reviewer_id: Uuid,
    draft: ReviewDraftInput,
    today: NaiveDate,
) -> ApiResult<PerformanceReview> {
    let mut errors = ValidationErrors::new();
    if let Some(rating) = draft.rating {
        check_rating(&mut errors, rating);
    }
    errors.into_result()?;
    let review = open_review(db, id).await?;
    let mut active: performance_review::ActiveModel = review.clone().into();
    if let Some(rating) = draft.rating {
        active.rating = Set(Some(rating));
    }
    if draft.summary.is_some() {
        active.summary = Set(clean(draft.summary));
    }
    if draft.strengths.is_some() {
        active.strengths = Set(clean(draft.strengths));
    }
    if draft.improvements.is_some() {
        active.improvements = Set(clean(draft.improvements));
    }
    if let Some(goals) = draft.goals {
        active.goals = Set(goals_json(goals));
    }
    if review.reviewer_id.is_none() {
        active.reviewer_id = Set(Some(reviewer_id));
    }
    active.status = Set(performance_review::Status::InProgress);
    active.updated_at = Set(Utc::now().into());
    let saved = active.update(db).await?;
    load_review_view(db, saved, today).await
}

pub async fn submit_review(
    db: &DatabaseConnection,
    id: Uuid,
    reviewer_id: Uuid,
    input: ReviewSubmissionInput,
    today: NaiveDate,
) -> ApiResult<PerformanceReview> {
    let mut errors = ValidationErrors::new();
    check_rating(&mut errors, input.rating);
    let summary = clean(Some(input.summary));
    if summary.is_none() {
        errors.add("summary", "Summary is required");
    }
    errors.into_result()?;
    let review = open_review(db, id).await?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: performance_review::ActiveModel = review.clone().into();
    active.rating = Set(Some(input.rating));
    active.summary = Set(summary);
    if input.strengths.is_some() {
        active.strengths = Set(clean(input.strengths));
    }
    if input.improvements.is_some() {
        active.improvements = Set(clean(input.improvements));
    }
    if let Some(goals) = input.goals {
        active.goals = Set(goals_json(goals));
    }
    if review.reviewer_id.is_none() {
        active.reviewer_id = Set(Some(reviewer_id));
    }
    active.status = Set(performance_review::Status::Completed);
    active.submitted_at = Set(Some(now));
    active.updated_at = Set(now);
    let saved = active.update(db).await?;
    tracing::info!(review_id = %saved.id, "review submitted");
    load_review_view(db, saved, today).await
}

/// Rating statistics over the submitted reviews of a cycle.
pub fn compute_metrics(cycle_id: Uuid, reviews: &[performance_review::Model]) -> PerformanceMetrics {
    let total = reviews.len();
    let completed: Vec<&performance_review::Model> = reviews
        .iter()
        .filter(|r| r.status == performance_review::Status::Completed)
        .collect();
    let ratings: Vec<f64> = completed.iter().filter_map(|r| r.rating).collect();
    let mut distribution: Vec<RatingBucket> = (1..=5)
        .map(|rating| RatingBucket { rating, count: 0 })
        .collect();
    for rating in &ratings {
        let bucket = rating.round().clamp(MIN_RATING, MAX_RATING) as usize - 1;
        distribution[bucket].count += 1;
    }
    PerformanceMetrics {
        cycle_id,
        average_rating: if ratings.is_empty() {
            None
        } else {
            Some(round_to(ratings.iter().sum::<f64>() / ratings.len() as f64, 2))
        },
        completion_rate: if total == 0 {
            0.0
        } else {
            round_to(completed.len() as f64 * 100.0 / total as f64, 1)
        },
        rated: ratings.len() as i64,
        distribution,
    }
}

pub async fn performance_metrics(
    db: &DatabaseConnection,
    cycle_id: Uuid,
) -> ApiResult<PerformanceMetrics> {
    find_cycle(db, cycle_id).await?;
    let reviews = performance_review::Entity::find()
        .filter(performance_review::Column::CycleId.eq(cycle_id))
        .all(db)
        .await?;
    Ok(compute_metrics(cycle_id, &reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn review(
        cycle_id: Uuid,
        status: performance_review::Status,
        rating: Option<f64>,
    ) -> performance_review::Model {
        let now: DateTimeWithTimeZone = Utc::now().into();
        performance_review::Model {
            id: Uuid::new_v4(),
            cycle_id,
            employee_id: Uuid::new_v4(),
            reviewer_id: None,
            status,
            rating,
            summary: None,
            strengths: None,
            improvements: None,
            goals: json!([]),
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overdue_is_derived_from_due_date() {
        let due = date(2025, 1, 31);
        assert_eq!(
            effective_status(performance_review::Status::InProgress, due, date(2025, 1, 31)),
            ReviewStatus::InProgress
        );
        assert_eq!(
            effective_status(performance_review::Status::NotStarted, due, date(2025, 2, 1)),
            ReviewStatus::Overdue
        );
        assert_eq!(
            effective_status(performance_review::Status::Completed, due, date(2025, 3, 1)),
            ReviewStatus::Completed
        );
    }

    #[test]
    fn cycle_counts_split_pending_from_overdue() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let cycle = review_cycle::Model {
            id: Uuid::new_v4(),
            name: "Q4".into(),
            period_start: date(2024, 10, 1),
            period_end: date(2024, 12, 31),
            due_date: date(2025, 1, 31),
            status: review_cycle::Status::Active,
            created_at: now,
            updated_at: now,
        };
        let reviews = vec![
            review(cycle.id, performance_review::Status::Completed, Some(4.0)),
            review(cycle.id, performance_review::Status::InProgress, None),
            review(cycle.id, performance_review::Status::NotStarted, None),
            review(Uuid::new_v4(), performance_review::Status::NotStarted, None),
        ];
        let before = cycle_view(cycle.clone(), &reviews, date(2025, 1, 15));
        assert_eq!((before.total, before.completed, before.pending, before.overdue), (3, 1, 2, 0));
        let after = cycle_view(cycle, &reviews, date(2025, 2, 15));
        assert_eq!((after.total, after.completed, after.pending, after.overdue), (3, 1, 0, 2));
    }

    #[test]
    fn unrated_reviews_sort_last_both_ways() {
        assert_eq!(compare_ratings(Some(4.0), None, true), Ordering::Less);
        assert_eq!(compare_ratings(Some(4.0), None, false), Ordering::Less);
        assert_eq!(compare_ratings(Some(4.0), Some(3.0), true), Ordering::Less);
        assert_eq!(compare_ratings(Some(4.0), Some(3.0), false), Ordering::Greater);
        assert_eq!(compare_ratings(None, None, true), Ordering::Equal);
    }

    #[test]
    fn metrics_use_submitted_ratings_only() {
        let cycle_id = Uuid::new_v4();
        let reviews = vec![
            review(cycle_id, performance_review::Status::Completed, Some(4.5)),
            review(cycle_id, performance_review::Status::Completed, Some(4.0)),
            review(cycle_id, performance_review::Status::Completed, Some(3.0)),
            review(cycle_id, performance_review::Status::InProgress, Some(2.0)),
            review(cycle_id, performance_review::Status::NotStarted, None),
            review(cycle_id, performance_review::Status::NotStarted, None),
        ];
        let metrics = compute_metrics(cycle_id, &reviews);
        assert_eq!(metrics.average_rating, Some(3.83));
        assert_eq!(metrics.completion_rate, 50.0);
        assert_eq!(metrics.rated, 3);
        let counts: Vec<i64> = metrics.distribution.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn metrics_without_ratings_have_no_average() {
        let metrics = compute_metrics(Uuid::new_v4(), &[]);
        assert_eq!(metrics.average_rating, None);
        assert_eq!(metrics.completion_rate, 0.0);
        assert_eq!(metrics.distribution.len(), 5);
    }
}
