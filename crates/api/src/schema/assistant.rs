use std::sync::Arc;

use async_graphql::{Context, Object};
use uuid::Uuid;

use super::{current_user, database, settings};
use crate::assistant::{
    conversation_messages, list_conversations, send_message, start_conversation, ChatExchange,
    ChatMessage, Conversation, Responder,
};
use crate::error::{ApiError, GqlResultExt};

fn responder(ctx: &Context<'_>) -> async_graphql::Result<Arc<dyn Responder>> {
    ctx.data::<Arc<dyn Responder>>()
        .cloned()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing assistant responder")))
        .gql()
}

#[derive(Default)]
pub struct AssistantQuery;

#[Object]
impl AssistantQuery {
    async fn conversations(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Conversation>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        list_conversations(db.as_ref(), &user).await.gql()
    }

    async fn conversation_messages(
        &self,
        ctx: &Context<'_>,
        conversation_id: Uuid,
    ) -> async_graphql::Result<Vec<ChatMessage>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        conversation_messages(db.as_ref(), &user, conversation_id)
            .await
            .gql()
    }
}

#[derive(Default)]
pub struct AssistantMutation;

#[Object]
impl AssistantMutation {
    async fn start_conversation(
        &self,
        ctx: &Context<'_>,
        title: Option<String>,
    ) -> async_graphql::Result<Conversation> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        start_conversation(db.as_ref(), &user, title).await.gql()
    }

    async fn send_message(
        &self,
        ctx: &Context<'_>,
        conversation_id: Uuid,
        content: String,
    ) -> async_graphql::Result<ChatExchange> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let settings = settings(ctx)?;
        let responder = responder(ctx)?;
        send_message(
            db.as_ref(),
            responder.as_ref(),
            &settings,
            &user,
            conversation_id,
            &content,
        )
        .await
        .gql()
    }
}
