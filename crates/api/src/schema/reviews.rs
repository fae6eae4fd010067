use async_graphql::{Context, Object};
use chrono::NaiveDate;
use uuid::Uuid;

use super::{database, require_role, today};
use crate::auth::UserRole;
use crate::error::GqlResultExt;
use crate::page::PageArgs;
use crate::reviews::{
    create_cycle, launch_cycle, list_cycles, list_reviews, performance_metrics, save_review,
    set_cycle_status, submit_review, CycleStatus, LaunchCycleResult, NewCycleInput,
    PerformanceMetrics, PerformanceReview, ReviewCycle, ReviewDraftInput, ReviewFilter,
    ReviewOrder, ReviewPage, ReviewSubmissionInput,
};

#[derive(Default)]
pub struct ReviewQuery;

#[Object]
impl ReviewQuery {
    async fn review_cycles(
        &self,
        ctx: &Context<'_>,
        as_of: Option<NaiveDate>,
    ) -> async_graphql::Result<Vec<ReviewCycle>> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        list_cycles(db.as_ref(), today(as_of)).await.gql()
    }

    async fn reviews(
        &self,
        ctx: &Context<'_>,
        cycle_id: Uuid,
        filter: Option<ReviewFilter>,
        order: Option<ReviewOrder>,
        first: Option<i32>,
        offset: Option<i32>,
        as_of: Option<NaiveDate>,
    ) -> async_graphql::Result<ReviewPage> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        let page = PageArgs::new(first, offset).gql()?;
        list_reviews(
            db.as_ref(),
            cycle_id,
            filter.unwrap_or_default(),
            order.unwrap_or_default(),
            page,
            today(as_of),
        )
        .await
        .gql()
    }

    async fn performance_metrics(
        &self,
        ctx: &Context<'_>,
        cycle_id: Uuid,
    ) -> async_graphql::Result<PerformanceMetrics> {
        require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        performance_metrics(db.as_ref(), cycle_id).await.gql()
    }
}

#[derive(Default)]
pub struct ReviewMutation;

#[Object]
impl ReviewMutation {
    async fn create_review_cycle(
        &self,
        ctx: &Context<'_>,
        input: NewCycleInput,
    ) -> async_graphql::Result<ReviewCycle> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        create_cycle(db.as_ref(), input, today(None)).await.gql()
    }

    async fn set_review_cycle_status(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        status: CycleStatus,
    ) -> async_graphql::Result<ReviewCycle> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        set_cycle_status(db.as_ref(), id, status, today(None)).await.gql()
    }

    async fn launch_review_cycle(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
    ) -> async_graphql::Result<LaunchCycleResult> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        launch_cycle(db.as_ref(), id, today(None)).await.gql()
    }

    async fn save_review(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        draft: ReviewDraftInput,
    ) -> async_graphql::Result<PerformanceReview> {
        let actor = require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        save_review(db.as_ref(), id, actor.user_id, draft, today(None))
            .await
            .gql()
    }

    async fn submit_review(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: ReviewSubmissionInput,
    ) -> async_graphql::Result<PerformanceReview> {
        let actor = require_role(ctx, UserRole::Manager)?;
        let db = database(ctx)?;
        submit_review(db.as_ref(), id, actor.user_id, input, today(None))
            .await
            .gql()
    }
}
