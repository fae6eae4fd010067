#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use api::auth::{AuthConfig, CurrentUser, UserRole};
use api::mailer::{EmailRelay, MailerConfig};
use api::seed::{seed_hr_demo, SeededHrRecords};
use api::settings::HrSettings;
use api::{build_schema, AppSchema, HrSchema};
use async_graphql::{Request, Variables};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;

pub const ADMIN: &str = "admin@smartemployee360.test";
pub const HR: &str = "hr@smartemployee360.test";
pub const MANAGER: &str = "manager@smartemployee360.test";
pub const EMPLOYEE: &str = "john.smith@smartemployee360.test";

pub struct HrTestContext {
    pub db: Arc<DatabaseConnection>,
    pub schema: HrSchema,
    pub seeded: SeededHrRecords,
}

pub fn test_auth() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".into(),
        local_auth_enabled: true,
        session_ttl_minutes: 30,
    }
}

impl HrTestContext {
    pub async fn new() -> Self {
        Self::with_mailer(MailerConfig::default()).await
    }

    pub async fn with_mailer(mailer: MailerConfig) -> Self {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        let seeded = seed_hr_demo(&conn).await.unwrap();
        let db = Arc::new(conn);
        let settings = HrSettings {
            chat_reply_delay: Duration::ZERO,
            ..HrSettings::default()
        };
        let AppSchema(schema) = build_schema(
            db.clone(),
            Arc::new(test_auth()),
            Arc::new(settings),
            Arc::new(EmailRelay::new(mailer).unwrap()),
        );
        Self { db, schema, seeded }
    }

    pub fn user(&self, email: &str) -> CurrentUser {
        let user = self
            .seeded
            .user_email(email)
            .unwrap_or_else(|| panic!("seeded user {email}"));
        CurrentUser {
            user_id: user.id,
            roles: vec![UserRole::from(user.role)],
        }
    }

    pub fn employee_id(&self, code: &str) -> String {
        self.seeded.employee_code(code).unwrap().id.to_string()
    }

    pub async fn exec_as(&self, email: &str, query: &str, vars: Value) -> async_graphql::Response {
        self.schema
            .execute(
                Request::new(query)
                    .variables(Variables::from_json(vars))
                    .data(self.user(email)),
            )
            .await
    }

    pub async fn exec_anonymous(&self, query: &str, vars: Value) -> async_graphql::Response {
        self.schema
            .execute(Request::new(query).variables(Variables::from_json(vars)))
            .await
    }

    /// Runs as `email` and returns `data.hr`, failing on any GraphQL error.
    pub async fn hr_ok(&self, email: &str, query: &str, vars: Value) -> Value {
        let resp = self.exec_as(email, query, vars).await;
        assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
        resp.data.into_json().unwrap()["hr"].clone()
    }
}

pub fn error_code(resp: &async_graphql::Response) -> Option<String> {
    resp.errors.first().and_then(|err| {
        err.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .map(|code| code.to_string().trim_matches('"').to_string())
    })
}

pub fn has_error_code(resp: &async_graphql::Response, code: &str) -> bool {
    error_code(resp).as_deref() == Some(code)
}
