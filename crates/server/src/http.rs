use std::sync::Arc;

use api::auth::{decode_token, resolve_session, AuthConfig, CurrentUser, SESSION_COOKIE};
use api::mailer::{EmailRelay, EmailRequest};
use api::{ApiError, HrSchema};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub const EMAIL_SENT: &str = "Email sent successfully";

#[derive(Clone)]
pub struct AppState {
    pub schema: HrSchema,
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthConfig>,
    pub mailer: Arc<EmailRelay>,
}

pub fn app_router(state: AppState, cors_origins: &[HeaderValue]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(cors_origins.iter().cloned()))
            .allow_credentials(true)
    }
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/graphiql", get(graphiql))
        .route("/graphql", get(graphql_handler).post(graphql_handler))
        .layer(cors);

    // The relay answers its own CORS so browsers on any origin can call it.
    let functions = Router::new().route(
        "/functions/send-email",
        post(send_email).options(send_email_preflight),
    );

    app.merge(functions)
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let db_ok = state.db.ping().await.is_ok();
    Json(json!({
        "ok": true,
        "db_ok": db_ok,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();
    if let Some(user) = authenticate_request(&state, &headers).await {
        request = request.data(user);
    }
    state.schema.execute(request).await.into()
}

async fn authenticate_request(state: &AppState, headers: &HeaderMap) -> Option<CurrentUser> {
    let token = extract_token(headers)?;
    let claims = match decode_token(&token, &state.auth) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring invalid session token");
            return None;
        }
    };
    match resolve_session(state.db.as_ref(), &claims).await {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(error = %err, "session lookup failed");
            None
        }
    }
}

/// Bearer header first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.trim().to_string())
}

const RELAY_CORS: [(header::HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        "Content-Type, Authorization",
    ),
];

fn relay_error(err: ApiError) -> Response {
    let status = match err {
        ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, RELAY_CORS, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn send_email(State(state): State<AppState>, body: Bytes) -> Response {
    let request: EmailRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting malformed email request");
            return relay_error(ApiError::invalid(
                "body",
                "Request body must be JSON with to, subject and html",
            ));
        }
    };
    match state.mailer.send(request).await {
        Ok(data) => (
            RELAY_CORS,
            Json(json!({
                "success": true,
                "message": EMAIL_SENT,
                "data": data,
            })),
        )
            .into_response(),
        Err(err) => relay_error(err),
    }
}

async fn send_email_preflight() -> impl IntoResponse {
    (RELAY_CORS, "ok")
}

pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use api::auth::{issue_token, UserRole};
    use api::mailer::{MailerConfig, NOT_CONFIGURED};
    use api::seed::{seed_hr_demo, HR_EMAIL};
    use api::settings::HrSettings;
    use api::{build_schema, AppSchema};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct TestApp {
        router: Router,
        auth: Arc<AuthConfig>,
        hr_user: Uuid,
    }

    async fn test_app(mailer: MailerConfig) -> TestApp {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        let seeded = seed_hr_demo(&conn).await.unwrap();
        let db = Arc::new(conn);
        let auth = Arc::new(AuthConfig {
            jwt_secret: "router-secret".into(),
            local_auth_enabled: true,
            session_ttl_minutes: 30,
        });
        let mailer = Arc::new(EmailRelay::new(mailer).unwrap());
        let AppSchema(schema) = build_schema(
            db.clone(),
            auth.clone(),
            Arc::new(HrSettings::default()),
            mailer.clone(),
        );
        let state = AppState {
            schema,
            db,
            auth: auth.clone(),
            mailer,
        };
        TestApp {
            router: app_router(state, &[]),
            auth,
            hr_user: seeded.user_email(HR_EMAIL).unwrap().id,
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn me_query() -> Body {
        Body::from(json!({ "query": "{ hr { me { user { email role } } } }" }).to_string())
    }

    #[tokio::test]
    async fn health_reports_database_and_version() {
        let app = test_app(MailerConfig::default()).await;
        let response = app
            .router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["db_ok"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn graphql_accepts_bearer_or_cookie_sessions() {
        let app = test_app(MailerConfig::default()).await;
        let token = issue_token(app.hr_user, &[UserRole::Hr], &app.auth).unwrap();

        let bearer = app
            .router
            .clone()
            .oneshot(
                Request::post("/graphql")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(me_query())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(bearer).await;
        assert_eq!(body["data"]["hr"]["me"]["user"]["email"], HR_EMAIL);
        assert_eq!(body["data"]["hr"]["me"]["user"]["role"], "HR");

        let cookie = app
            .router
            .clone()
            .oneshot(
                Request::post("/graphql")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, format!("theme=dark; {SESSION_COOKIE}={token}"))
                    .body(me_query())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(cookie).await;
        assert_eq!(body["data"]["hr"]["me"]["user"]["email"], HR_EMAIL);

        let anonymous = app
            .router
            .oneshot(
                Request::post("/graphql")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(me_query())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(anonymous).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn send_email_preflight_and_failures() {
        let app = test_app(MailerConfig::default()).await;
        let preflight = app
            .router
            .clone()
            .oneshot(
                Request::options("/functions/send-email")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(preflight.status(), StatusCode::OK);
        assert_eq!(
            preflight.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(
            preflight.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );

        let malformed = app
            .router
            .clone()
            .oneshot(
                Request::post("/functions/send-email")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"subject\": 1}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let invalid = app
            .router
            .clone()
            .oneshot(
                Request::post("/functions/send-email")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "to": "nobody", "subject": "Hi", "html": "<p>x</p>" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(invalid).await["error"].is_string());

        let unconfigured = app
            .router
            .oneshot(
                Request::post("/functions/send-email")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "to": "hr@smartemployee360.test", "subject": "Hi", "html": "<p>x</p>" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unconfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(unconfigured).await["error"], NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn send_email_wraps_the_provider_reply() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_789" })))
            .expect(1)
            .mount(&provider)
            .await;
        let app = test_app(MailerConfig {
            api_key: Some("re_router".into()),
            api_base: provider.uri(),
            timeout: Duration::from_secs(2),
            ..MailerConfig::default()
        })
        .await;
        let response = app
            .router
            .oneshot(
                Request::post("/functions/send-email")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::ORIGIN, "https://hr.acme.io")
                    .body(Body::from(
                        json!({
                            "to": ["a@smartemployee360.test", "b@smartemployee360.test"],
                            "subject": "Payroll processed",
                            "html": "<p>Done</p>"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], EMAIL_SENT);
        assert_eq!(body["data"]["id"], "email_789");
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("se360_session=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }
}
