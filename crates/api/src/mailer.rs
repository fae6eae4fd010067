use std::time::Duration;

use async_graphql::InputObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info_span, Instrument};

use crate::employees::is_valid_email;
use crate::error::{ApiError, ApiResult, ValidationErrors};

pub const NOT_CONFIGURED: &str = "Email service is not configured";
pub const SEND_FAILED: &str = "Failed to send email";

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub default_from: String,
    pub timeout: Duration,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.resend.com".into(),
            default_from: "onboarding@resend.dev".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// One address or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Recipients::One(addr) => vec![addr.as_str()],
            Recipients::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: Recipients,
    pub subject: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl EmailRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();
        let addresses = self.to.addresses();
        if addresses.is_empty() {
            errors.add("to", "At least one recipient is required");
        } else if let Some(bad) = addresses.iter().find(|a| !is_valid_email(a.trim())) {
            errors.add("to", format!("Invalid recipient address {}", bad));
        }
        if self.subject.trim().is_empty() {
            errors.add("subject", "Subject is required");
        }
        if self.html.trim().is_empty() {
            errors.add("html", "Email body is required");
        }
        if let Some(from) = &self.from {
            if !is_valid_email(sender_address(from)) {
                errors.add("from", "Sender must be a valid email address");
            }
        }
        errors.into_result()
    }
}

/// The address part of a sender, accepting both `addr` and `Name <addr>`.
fn sender_address(from: &str) -> &str {
    let from = from.trim();
    match from.strip_suffix('>').and_then(|rest| rest.rsplit_once('<')) {
        Some((_, address)) => address.trim(),
        None => from,
    }
}

#[derive(Debug, Clone, InputObject)]
pub struct SendEmailInput {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub from: Option<String>,
}

impl From<SendEmailInput> for EmailRequest {
    fn from(input: SendEmailInput) -> Self {
        let to = match <[String; 1]>::try_from(input.to) {
            Ok([single]) => Recipients::One(single),
            Err(list) => Recipients::Many(list),
        };
        Self {
            to,
            subject: input.subject,
            html: input.html,
            from: input.from,
        }
    }
}

#[derive(Serialize)]
struct ProviderPayload<'a> {
    from: &'a str,
    to: &'a Recipients,
    subject: &'a str,
    html: &'a str,
}

/// Thin client for a Resend-compatible transactional email API.
#[derive(Debug, Clone)]
pub struct EmailRelay {
    client: reqwest::Client,
    config: MailerConfig,
}

impl EmailRelay {
    pub fn new(config: MailerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn send(&self, request: EmailRequest) -> ApiResult<Value> {
        request.validate()?;
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ApiError::Unavailable(NOT_CONFIGURED));
        };
        let recipients = request.to.addresses().len();
        let span = info_span!("hr.mailer.send", recipients);
        async move {
            let from = request
                .from
                .as_deref()
                .map(str::trim)
                .unwrap_or(&self.config.default_from);
            let payload = ProviderPayload {
                from,
                to: &request.to,
                subject: request.subject.trim(),
                html: &request.html,
            };
            let url = format!("{}/emails", self.config.api_base.trim_end_matches('/'));
            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .await
                .map_err(|err| {
                    tracing::warn!(error = %err, "email provider unreachable");
                    ApiError::Upstream(SEND_FAILED.into())
                })?;
            let status = response.status();
            let body = match response.json::<Value>().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(%status, error = %err, "email provider sent a non-JSON body");
                    Value::Null
                }
            };
            if !status.is_success() {
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(SEND_FAILED)
                    .to_string();
                tracing::warn!(%status, %message, "email provider rejected request");
                return Err(ApiError::Upstream(message));
            }
            tracing::info!("email accepted by provider");
            Ok(body)
        }
        .instrument(span)
        .await
    }
}
