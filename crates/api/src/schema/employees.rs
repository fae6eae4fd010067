use async_graphql::{Context, Object};
use uuid::Uuid;

use super::{database, require_role};
use crate::auth::{CurrentUser, UserRole};
use crate::employees::{
    create_department, create_employee, deactivate_employee, employee_stats, get_employee,
    list_departments, list_employees, update_employee, Department, Employee, EmployeeFilter,
    EmployeeOrder, EmployeePage, EmployeePatch, EmployeeStats, NewEmployeeInput,
};
use crate::error::{ApiError, ApiResult, GqlResultExt};
use crate::page::PageArgs;

/// Nobody hands out a role above their own.
fn ensure_can_grant(actor: &CurrentUser, role: Option<UserRole>) -> ApiResult<()> {
    match role {
        Some(role) => actor.require(role),
        None => Ok(()),
    }
}

#[derive(Default)]
pub struct EmployeeQuery;

#[Object]
impl EmployeeQuery {
    async fn employees(
        &self,
        ctx: &Context<'_>,
        filter: Option<EmployeeFilter>,
        order: Option<EmployeeOrder>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<EmployeePage> {
        require_role(ctx, UserRole::Employee)?;
        let db = database(ctx)?;
        let page = PageArgs::new(first, offset).gql()?;
        list_employees(
            db.as_ref(),
            filter.unwrap_or_default(),
            order.unwrap_or_default(),
            page,
        )
        .await
        .gql()
    }

    async fn employee(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<Option<Employee>> {
        require_role(ctx, UserRole::Employee)?;
        let db = database(ctx)?;
        get_employee(db.as_ref(), id).await.gql()
    }

    async fn departments(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Department>> {
        require_role(ctx, UserRole::Employee)?;
        let db = database(ctx)?;
        list_departments(db.as_ref()).await.gql()
    }

    async fn employee_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<EmployeeStats> {
        require_role(ctx, UserRole::Employee)?;
        let db = database(ctx)?;
        employee_stats(db.as_ref()).await.gql()
    }
}

#[derive(Default)]
pub struct EmployeeMutation;

#[Object]
impl EmployeeMutation {
    async fn create_department(
        &self,
        ctx: &Context<'_>,
        name: String,
        location: Option<String>,
    ) -> async_graphql::Result<Department> {
        require_role(ctx, UserRole::Hr)?;
        let db = database(ctx)?;
        create_department(db.as_ref(), &name, location).await.gql()
    }

    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<Employee> {
        let actor = require_role(ctx, UserRole::Hr)?;
        ensure_can_grant(&actor, input.role).gql()?;
        let db = database(ctx)?;
        create_employee(db.as_ref(), input).await.gql()
    }

    /// `userId` is the account id behind the employee profile.
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
        patch: EmployeePatch,
    ) -> async_graphql::Result<Employee> {
        let actor = require_role(ctx, UserRole::Hr)?;
        ensure_can_grant(&actor, patch.role).gql()?;
        let db = database(ctx)?;
        update_employee(db.as_ref(), user_id, patch).await.gql()
    }

    async fn deactivate_employee(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
    ) -> async_graphql::Result<Employee> {
        let actor = require_role(ctx, UserRole::Hr)?;
        if actor.user_id == user_id {
            return Err(ApiError::Conflict("You cannot deactivate your own account".into())).gql();
        }
        let db = database(ctx)?;
        deactivate_employee(db.as_ref(), user_id).await.gql()
    }
}
