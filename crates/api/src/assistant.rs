use async_graphql::{Enum, SimpleObject};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use entity::{
    attendance_record, chat_message, conversation, employee_profile, payroll_line,
    performance_review, review_cycle,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::attendance::AttendanceStatus;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::payroll::PayrollStatus;
use crate::settings::HrSettings;

pub const DEFAULT_TITLE: &str = "New conversation";
pub const MAX_MESSAGE_CHARS: usize = 4000;
const TITLE_CHARS: usize = 60;
const RECENT_ATTENDANCE: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Leave,
    Attendance,
    Payroll,
    Performance,
    Policy,
    Profile,
    Help,
    General,
}

const KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Leave, &["leave", "vacation", "time off"]),
    (Topic::Attendance, &["timesheet", "attendance", "clock"]),
    (Topic::Payroll, &["pay", "salary", "payroll"]),
    (Topic::Performance, &["performance", "review", "evaluation"]),
    (Topic::Policy, &["policy", "policies", "handbook"]),
    (Topic::Profile, &["profile", "update", "information"]),
    (Topic::Help, &["help", "support", "contact"]),
];

/// First topic whose keywords appear in the message.
pub fn classify(text: &str) -> Topic {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(
        &self,
        db: &DatabaseConnection,
        user: &CurrentUser,
        message: &str,
    ) -> ApiResult<String>;
}

/// Answers from the caller's own HR records.
#[derive(Debug, Default, Clone, Copy)]
pub struct HrAssistant;

const NO_PROFILE: &str = "I could not find an employee profile linked to your account.";
const POLICY_HINT: &str =
    "Company policies are in the employee handbook; HR can share the latest copy.";
const PROFILE_HINT: &str =
    "You can update your contact details from the profile page; HR handles role or salary changes.";
const HELP_HINT: &str = "For anything I cannot answer, contact the HR team directly.";
pub const GENERAL_HINT: &str = "I can help with leave, attendance, payroll and performance reviews.";

impl HrAssistant {
    async fn leave_reply(db: &DatabaseConnection, employee: &employee_profile::Model) -> ApiResult<String> {
        let days = attendance_record::Entity::find()
            .filter(attendance_record::Column::EmployeeId.eq(employee.id))
            .filter(attendance_record::Column::Status.eq(attendance_record::Status::Leave))
            .count(db)
            .await?;
        Ok(format!(
            "You have {} leave day(s) on record. Ask HR to book new time off.",
            days
        ))
    }

    async fn attendance_reply(
        db: &DatabaseConnection,
        employee: &employee_profile::Model,
    ) -> ApiResult<String> {
        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::EmployeeId.eq(employee.id))
            .order_by_desc(attendance_record::Column::WorkDate)
            .limit(RECENT_ATTENDANCE)
            .all(db)
            .await?;
        if rows.is_empty() {
            return Ok("No attendance has been recorded for you yet.".into());
        }
        let days: Vec<String> = rows
            .iter()
            .map(|row| {
                format!(
                    "{} {} ({:.1}h)",
                    row.work_date,
                    AttendanceStatus::from(row.status).as_str(),
                    row.worked_minutes as f64 / 60.0
                )
            })
            .collect();
        Ok(format!("Your latest attendance: {}.", days.join("; ")))
    }

    async fn payroll_reply(
        db: &DatabaseConnection,
        employee: &employee_profile::Model,
    ) -> ApiResult<String> {
        let line = payroll_line::Entity::find()
            .filter(payroll_line::Column::EmployeeId.eq(employee.id))
            .order_by_desc(payroll_line::Column::Period)
            .one(db)
            .await?;
        Ok(match line {
            Some(line) => format!(
                "Your {} payroll: net {} after {} tax ({}).",
                line.period,
                format_cents(line.net_pay_cents),
                format_cents(line.tax_cents),
                PayrollStatus::from(line.status).as_str()
            ),
            None => "No payroll lines exist for you yet.".into(),
        })
    }

    async fn performance_reply(
        db: &DatabaseConnection,
        employee: &employee_profile::Model,
    ) -> ApiResult<String> {
        let latest = performance_review::Entity::find()
            .filter(performance_review::Column::EmployeeId.eq(employee.id))
            .find_also_related(review_cycle::Entity)
            .order_by_desc(review_cycle::Column::PeriodStart)
            .one(db)
            .await?;
        let Some((review, cycle)) = latest else {
            return Ok("You are not part of any review cycle yet.".into());
        };
        let cycle_name = cycle.map(|c| c.name).unwrap_or_else(|| "your last cycle".into());
        Ok(match (review.status, review.rating) {
            (performance_review::Status::Completed, Some(rating)) => {
                format!("Your review for {} is complete with a rating of {:.1}.", cycle_name, rating)
            }
            (performance_review::Status::InProgress, _) => {
                format!("Your review for {} is in progress.", cycle_name)
            }
            _ => format!("Your review for {} has not started yet.", cycle_name),
        })
    }
}

#[async_trait]
impl Responder for HrAssistant {
    async fn reply(
        &self,
        db: &DatabaseConnection,
        user: &CurrentUser,
        message: &str,
    ) -> ApiResult<String> {
        let topic = classify(message);
        let canned = match topic {
            Topic::Policy => Some(POLICY_HINT),
            Topic::Profile => Some(PROFILE_HINT),
            Topic::Help => Some(HELP_HINT),
            Topic::General => Some(GENERAL_HINT),
            _ => None,
        };
        if let Some(text) = canned {
            return Ok(text.into());
        }
        let Some(employee) = employee_profile::Entity::find()
            .filter(employee_profile::Column::UserId.eq(user.user_id))
            .one(db)
            .await?
        else {
            return Ok(NO_PROFILE.into());
        };
        match topic {
            Topic::Leave => Self::leave_reply(db, &employee).await,
            Topic::Attendance => Self::attendance_reply(db, &employee).await,
            Topic::Payroll => Self::payroll_reply(db, &employee).await,
            _ => Self::performance_reply(db, &employee).await,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl From<chat_message::Role> for MessageRole {
    fn from(value: chat_message::Role) -> Self {
        match value {
            chat_message::Role::User => MessageRole::User,
            chat_message::Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<conversation::Model> for Conversation {
    fn from(model: conversation::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<chat_message::Model> for ChatMessage {
    fn from(model: chat_message::Model) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            role: model.role.into(),
            content: model.content,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ChatExchange {
    pub conversation: Conversation,
    pub question: ChatMessage,
    pub answer: ChatMessage,
}

pub async fn start_conversation(
    db: &DatabaseConnection,
    user: &CurrentUser,
    title: Option<String>,
) -> ApiResult<Conversation> {
    let title = title
        .map(|t| t.trim().chars().take(TITLE_CHARS).collect::<String>())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = conversation::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        title: Set(title),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model.into())
}

pub async fn list_conversations(
    db: &DatabaseConnection,
    user: &CurrentUser,
) -> ApiResult<Vec<Conversation>> {
    Ok(conversation::Entity::find()
        .filter(conversation::Column::UserId.eq(user.user_id))
        .order_by_desc(conversation::Column::UpdatedAt)
        .order_by_desc(conversation::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Conversation::from)
        .collect())
}

async fn owned_conversation(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: Uuid,
) -> ApiResult<conversation::Model> {
    conversation::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|c| c.user_id == user.user_id)
        .ok_or(ApiError::NotFound("Conversation"))
}

pub async fn conversation_messages(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: Uuid,
) -> ApiResult<Vec<ChatMessage>> {
    owned_conversation(db, user, id).await?;
    Ok(chat_message::Entity::find()
        .filter(chat_message::Column::ConversationId.eq(id))
        .order_by_asc(chat_message::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(ChatMessage::from)
        .collect())
}

async fn store_message<C: ConnectionTrait>(
    db: &C,
    conversation_id: Uuid,
    role: chat_message::Role,
    content: String,
    at: DateTime<Utc>,
) -> ApiResult<chat_message::Model> {
    Ok(chat_message::ActiveModel {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation_id),
        role: Set(role),
        content: Set(content),
        created_at: Set(at.into()),
    }
    .insert(db)
    .await?)
}

async fn latest_message_at(
    db: &DatabaseConnection,
    conversation_id: Uuid,
) -> ApiResult<Option<DateTime<Utc>>> {
    Ok(chat_message::Entity::find()
        .filter(chat_message::Column::ConversationId.eq(conversation_id))
        .order_by_desc(chat_message::Column::CreatedAt)
        .one(db)
        .await?
        .map(|m| m.created_at.with_timezone(&Utc)))
}

/// Waits the configured delay, asks the responder, then stores the question and
/// the reply together. A failed reply leaves the conversation untouched.
pub async fn send_message(
    db: &DatabaseConnection,
    responder: &dyn Responder,
    settings: &HrSettings,
    user: &CurrentUser,
    conversation_id: Uuid,
    content: &str,
) -> ApiResult<ChatExchange> {
    let span = info_span!("hr.assistant.send", %conversation_id);
    async move {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::invalid("content", "Message cannot be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::invalid(
                "content",
                format!("Message cannot exceed {} characters", MAX_MESSAGE_CHARS),
            ));
        }
        let convo = owned_conversation(db, user, conversation_id).await?;
        let asked_at = match latest_message_at(db, conversation_id).await? {
            Some(last) => Utc::now().max(last + Duration::milliseconds(1)),
            None => Utc::now(),
        };

        if !settings.chat_reply_delay.is_zero() {
            tokio::time::sleep(settings.chat_reply_delay).await;
        }
        let reply = responder.reply(db, user, content).await?;
        let answered_at = Utc::now().max(asked_at + Duration::milliseconds(1));

        let txn = db.begin().await?;
        let question = store_message(
            &txn,
            conversation_id,
            chat_message::Role::User,
            content.to_string(),
            asked_at,
        )
        .await?;
        let answer = store_message(
            &txn,
            conversation_id,
            chat_message::Role::Assistant,
            reply,
            answered_at,
        )
        .await?;
        let retitle = convo.title == DEFAULT_TITLE;
        let mut active: conversation::ActiveModel = convo.into();
        if retitle {
            active.title = Set(content.chars().take(TITLE_CHARS).collect());
        }
        active.updated_at = Set(answered_at.into());
        let convo = active.update(&txn).await?;
        txn.commit().await?;
        tracing::debug!(topic = ?classify(content), "assistant replied");

        Ok(ChatExchange {
            conversation: convo.into(),
            question: question.into(),
            answer: answer.into(),
        })
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_pick_the_first_matching_topic() {
        assert_eq!(classify("How many vacation days do I have?"), Topic::Leave);
        assert_eq!(classify("Show my TIMESHEET"), Topic::Attendance);
        assert_eq!(classify("When is salary paid?"), Topic::Payroll);
        assert_eq!(classify("my performance evaluation"), Topic::Performance);
        assert_eq!(classify("where is the handbook"), Topic::Policy);
        assert_eq!(classify("update my phone"), Topic::Profile);
        assert_eq!(classify("I need support"), Topic::Help);
        assert_eq!(classify("good morning"), Topic::General);
    }

    #[test]
    fn earlier_topics_win_ties() {
        assert_eq!(classify("leave policy"), Topic::Leave);
        assert_eq!(classify("review my payroll"), Topic::Payroll);
        assert_eq!(classify("help with attendance"), Topic::Attendance);
    }

    #[test]
    fn cents_format_as_dollars() {
        assert_eq!(format_cents(675_000), "$6750.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-1_250), "-$12.50");
    }
}
