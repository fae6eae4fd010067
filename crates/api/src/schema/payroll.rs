use async_graphql::{Context, Object};
use uuid::Uuid;

use super::{database, require_role};
use crate::auth::UserRole;
use crate::error::GqlResultExt;
use crate::page::PageArgs;
use crate::payroll::{
    list_payroll, payroll_summary, payroll_trend, transition_payroll, upsert_payroll_line,
    PayrollFilter, PayrollLine, PayrollLineInput, PayrollOrder, PayrollPage, PayrollStatus,
    PayrollSummary, PayrollTrendPoint, DEFAULT_TREND_MONTHS,
};

#[derive(Default)]
pub struct PayrollQuery;

#[Object]
impl PayrollQuery {
    async fn payroll(
        &self,
        ctx: &Context<'_>,
        period: String,
        filter: Option<PayrollFilter>,
        order: Option<PayrollOrder>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PayrollPage> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        let page = PageArgs::new(first, offset).gql()?;
        list_payroll(
            db.as_ref(),
            &period,
            filter.unwrap_or_default(),
            order.unwrap_or_default(),
            page,
        )
        .await
        .gql()
    }

    async fn payroll_summary(
        &self,
        ctx: &Context<'_>,
        period: String,
        filter: Option<PayrollFilter>,
    ) -> async_graphql::Result<PayrollSummary> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        payroll_summary(db.as_ref(), &period, filter.unwrap_or_default())
            .await
            .gql()
    }

    async fn payroll_trend(
        &self,
        ctx: &Context<'_>,
        until_period: String,
        months: Option<i32>,
    ) -> async_graphql::Result<Vec<PayrollTrendPoint>> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        let months = months.unwrap_or(DEFAULT_TREND_MONTHS);
        payroll_trend(db.as_ref(), &until_period, months).await.gql()
    }
}

#[derive(Default)]
pub struct PayrollMutation;

#[Object]
impl PayrollMutation {
    async fn upsert_payroll_line(
        &self,
        ctx: &Context<'_>,
        input: PayrollLineInput,
    ) -> async_graphql::Result<PayrollLine> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        upsert_payroll_line(db.as_ref(), input).await.gql()
    }

    async fn transition_payroll(
        &self,
        ctx: &Context<'_>,
        ids: Vec<Uuid>,
        target: PayrollStatus,
    ) -> async_graphql::Result<Vec<PayrollLine>> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        transition_payroll(db.as_ref(), ids, target).await.gql()
    }
}
