use async_graphql::{Context, Object};
use chrono::NaiveDate;
use uuid::Uuid;

use super::{database, require_role, settings};
use crate::attendance::{
    attendance_stats, bulk_set_attendance_status, detect_anomalies, list_attendance,
    record_attendance, AttendanceAnomaly, AttendanceEntry, AttendanceFilter, AttendanceInput,
    AttendanceOrder, AttendancePage, AttendanceStats, AttendanceStatus,
};
use crate::auth::UserRole;
use crate::error::GqlResultExt;
use crate::page::PageArgs;

#[derive(Default)]
pub struct AttendanceQuery;

#[Object]
impl AttendanceQuery {
    async fn attendance(
        &self,
        ctx: &Context<'_>,
        filter: Option<AttendanceFilter>,
        order: Option<AttendanceOrder>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<AttendancePage> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        let page = PageArgs::new(first, offset).gql()?;
        list_attendance(
            db.as_ref(),
            filter.unwrap_or_default(),
            order.unwrap_or_default(),
            page,
        )
        .await
        .gql()
    }

    async fn attendance_stats(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
        department_id: Option<Uuid>,
    ) -> async_graphql::Result<AttendanceStats> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        attendance_stats(db.as_ref(), date, department_id).await.gql()
    }

    async fn attendance_anomalies(
        &self,
        ctx: &Context<'_>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> async_graphql::Result<Vec<AttendanceAnomaly>> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        detect_anomalies(db.as_ref(), from, to).await.gql()
    }
}

#[derive(Default)]
pub struct AttendanceMutation;

#[Object]
impl AttendanceMutation {
    async fn record_attendance(
        &self,
        ctx: &Context<'_>,
        input: AttendanceInput,
    ) -> async_graphql::Result<AttendanceEntry> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        let settings = settings(ctx)?;
        record_attendance(db.as_ref(), &settings.attendance, input)
            .await
            .gql()
    }

    /// Returns how many records changed.
    async fn set_attendance_status(
        &self,
        ctx: &Context<'_>,
        ids: Vec<Uuid>,
        status: AttendanceStatus,
    ) -> async_graphql::Result<i64> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        let settings = settings(ctx)?;
        bulk_set_attendance_status(db.as_ref(), &settings.attendance, ids, status)
            .await
            .map(|updated| updated as i64)
            .gql()
    }
}
