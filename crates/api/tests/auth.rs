mod common;

use api::auth::{decode_token, resolve_session, UserRole};
use common::{has_error_code, test_auth, HrTestContext, ADMIN, EMPLOYEE};
use entity::user_profile;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde_json::json;

const LOGIN: &str = r#"
    mutation Login($email: String!, $password: String!) {
        hr { login(email: $email, password: $password) { ok token error user { email role } } }
    }
"#;

#[tokio::test]
async fn login_sets_session_cookie_and_token() {
    let ctx = HrTestContext::new().await;
    let resp = ctx
        .exec_anonymous(
            LOGIN,
            json!({ "email": "  Admin@SmartEmployee360.test ", "password": "admin123" }),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let cookie = resp
        .http_headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("se360_session="));
    assert!(cookie.contains("HttpOnly"));

    let payload = resp.data.into_json().unwrap()["hr"]["login"].clone();
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["user"]["email"], ADMIN);
    assert_eq!(payload["user"]["role"], "ADMIN");

    let claims = decode_token(payload["token"].as_str().unwrap(), &test_auth()).unwrap();
    let session = resolve_session(ctx.db.as_ref(), &claims).await.unwrap().unwrap();
    assert_eq!(session.roles, vec![UserRole::Admin]);
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let ctx = HrTestContext::new().await;
    for (email, password) in [
        (ADMIN, "wrong-password"),
        ("nobody@smartemployee360.test", "admin123"),
        ("emily.davis@smartemployee360.test", "anything"),
    ] {
        let resp = ctx
            .exec_anonymous(LOGIN, json!({ "email": email, "password": password }))
            .await;
        assert!(resp.errors.is_empty());
        let payload = resp.data.into_json().unwrap()["hr"]["login"].clone();
        assert_eq!(payload["ok"], false);
        assert_eq!(payload["error"], "Invalid credentials");
        assert!(payload["token"].is_null());
    }
}

#[tokio::test]
async fn disabled_accounts_cannot_log_in_or_hold_sessions() {
    let ctx = HrTestContext::new().await;
    let john = ctx.seeded.user_email(EMPLOYEE).unwrap().clone();
    let mut active: user_profile::ActiveModel = john.clone().into();
    active.is_active = Set(false);
    active.update(ctx.db.as_ref()).await.unwrap();

    let resp = ctx
        .exec_anonymous(LOGIN, json!({ "email": EMPLOYEE, "password": "employee123" }))
        .await;
    let payload = resp.data.into_json().unwrap()["hr"]["login"].clone();
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["error"], "Account disabled");

    let token = api::auth::issue_token(john.id, &[UserRole::Employee], &test_auth()).unwrap();
    let claims = decode_token(&token, &test_auth()).unwrap();
    assert!(resolve_session(ctx.db.as_ref(), &claims).await.unwrap().is_none());
    assert!(user_profile::Entity::find_by_id(john.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn me_returns_profile_and_employee_record() {
    let ctx = HrTestContext::new().await;
    let query = r#"
        query { hr { me { roles user { fullName } employee { employeeCode department manager location } } } }
    "#;
    let me = ctx.hr_ok(EMPLOYEE, query, json!({})).await["me"].clone();
    assert_eq!(me["roles"], json!(["EMPLOYEE"]));
    assert_eq!(me["user"]["fullName"], "John Smith");
    assert_eq!(me["employee"]["employeeCode"], "EMP001");
    assert_eq!(me["employee"]["department"], "Engineering");
    assert_eq!(me["employee"]["manager"], "Michael Chen");
    assert_eq!(me["employee"]["location"], "San Francisco");

    let anonymous = ctx.exec_anonymous(query, json!({})).await;
    assert!(has_error_code(&anonymous, "UNAUTHENTICATED"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let ctx = HrTestContext::new().await;
    let resp = ctx
        .exec_anonymous("mutation { hr { logout } }", json!({}))
        .await;
    assert!(resp.errors.is_empty());
    let cookie = resp.http_headers.get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}
