use std::sync::Arc;

use async_graphql::{Context, Json, Object};
use serde_json::Value;

use super::require_role;
use crate::auth::UserRole;
use crate::error::{ApiError, GqlResultExt};
use crate::mailer::{EmailRelay, SendEmailInput};

#[derive(Default)]
pub struct MailMutation;

#[Object]
impl MailMutation {
    /// Relays one message through the configured provider and returns its reply.
    async fn send_email(
        &self,
        ctx: &Context<'_>,
        input: SendEmailInput,
    ) -> async_graphql::Result<Json<Value>> {
        require_role(ctx, UserRole::Hr)?;
        let relay = ctx
            .data::<Arc<EmailRelay>>()
            .map_err(|_| ApiError::internal(anyhow::anyhow!("missing email relay")))
            .gql()?;
        relay.send(input.into()).await.map(Json).gql()
    }
}
