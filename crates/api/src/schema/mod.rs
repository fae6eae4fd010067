use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, MergedObject, Object, Schema};
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;

use crate::assistant::{HrAssistant, Responder};
use crate::auth::{AuthConfig, CurrentUser, UserRole};
use crate::error::{ApiError, GqlResultExt};
use crate::mailer::EmailRelay;
use crate::settings::HrSettings;

mod account;
mod assistant;
mod attendance;
mod employees;
mod mail;
mod payroll;
mod reviews;

pub use account::{Account, AuthPayload, MePayload};

pub type HrSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub struct AppSchema(pub HrSchema);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    settings: Arc<HrSettings>,
    mailer: Arc<EmailRelay>,
) -> AppSchema {
    let responder: Arc<dyn Responder> = Arc::new(HrAssistant);
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .data(settings)
        .data(mailer)
        .data(responder)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    async fn hr(&self) -> HrQuery {
        HrQuery::default()
    }
}

#[Object]
impl MutationRoot {
    async fn hr(&self) -> HrMutation {
        HrMutation::default()
    }
}

#[derive(MergedObject, Default)]
pub struct HrQuery(
    account::AccountQuery,
    employees::EmployeeQuery,
    attendance::AttendanceQuery,
    payroll::PayrollQuery,
    reviews::ReviewQuery,
    assistant::AssistantQuery,
);

#[derive(MergedObject, Default)]
pub struct HrMutation(
    account::AccountMutation,
    employees::EmployeeMutation,
    attendance::AttendanceMutation,
    payroll::PayrollMutation,
    reviews::ReviewMutation,
    assistant::AssistantMutation,
    mail::MailMutation,
);

fn missing(what: &str) -> async_graphql::Error {
    ApiError::internal(anyhow::anyhow!("missing {} in schema data", what)).extend()
}

pub(crate) fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| missing("database connection"))
}

pub(crate) fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| missing("auth configuration"))
}

pub(crate) fn settings(ctx: &Context<'_>) -> async_graphql::Result<Arc<HrSettings>> {
    ctx.data::<Arc<HrSettings>>()
        .cloned()
        .map_err(|_| missing("HR settings"))
}

pub(crate) fn current_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data_opt::<CurrentUser>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)
        .gql()
}

pub(crate) fn require_role(ctx: &Context<'_>, role: UserRole) -> async_graphql::Result<CurrentUser> {
    let user = current_user(ctx)?;
    user.require(role).gql()?;
    Ok(user)
}

/// Reference date for derived states; tests pin it through `asOf`.
pub(crate) fn today(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}
