use async_graphql::{Context, Object, SimpleObject};
use entity::user_profile;
use sea_orm::EntityTrait;
use uuid::Uuid;

use super::{auth_config, current_user, database};
use crate::auth::{authenticate, issue_token, LoginOutcome, UserRole, SESSION_COOKIE};
use crate::employees::{get_employee_by_user, Employee};
use crate::error::{ApiError, GqlResultExt};

#[derive(Clone, Debug, SimpleObject)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl From<user_profile::Model> for Account {
    fn from(model: user_profile::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            avatar_url: model.avatar_url,
            role: model.role.into(),
            is_active: model.is_active,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthPayload {
    pub ok: bool,
    pub token: Option<String>,
    pub user: Option<Account>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn rejected(reason: &str) -> Self {
        Self {
            ok: false,
            token: None,
            user: None,
            error: Some(reason.to_string()),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: Account,
    pub roles: Vec<UserRole>,
    pub employee: Option<Employee>,
}

#[derive(Default)]
pub struct AccountQuery;

#[Object]
impl AccountQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let viewer = current_user(ctx)?;
        let db = database(ctx)?;
        let user = user_profile::Entity::find_by_id(viewer.user_id)
            .one(db.as_ref())
            .await
            .map_err(ApiError::from)
            .gql()?
            .ok_or(ApiError::Unauthenticated)
            .gql()?;
        let employee = get_employee_by_user(db.as_ref(), viewer.user_id).await.gql()?;
        Ok(MePayload {
            user: user.into(),
            roles: viewer.roles,
            employee,
        })
    }
}

#[derive(Default)]
pub struct AccountMutation;

#[Object]
impl AccountMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if !auth.local_auth_enabled {
            return Err(ApiError::Forbidden).gql();
        }
        let db = database(ctx)?;
        let user = match authenticate(db.as_ref(), &email, &password).await.gql()? {
            LoginOutcome::Authenticated(user) => user,
            LoginOutcome::Rejected(reason) => {
                tracing::info!(reason, "login rejected");
                return Ok(AuthPayload::rejected(reason));
            }
        };
        let roles = [UserRole::from(user.role)];
        let token = issue_token(user.id, &roles, &auth)
            .map_err(|err| ApiError::internal(anyhow::anyhow!("token signing failed: {}", err)))
            .gql()?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(AuthPayload {
            ok: true,
            token: Some(token),
            user: Some(user.into()),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> bool {
        append_session_cookie(ctx, "", -1);
        true
    }
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let cookie = if ttl_minutes < 0 {
        format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE)
    } else {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            token,
            ttl_minutes * 60
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}
