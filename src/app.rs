use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, coins, skills};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(skills::router())
                .merge(coins::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let state = AppState::fake();
            Self {
                router: build_app(state.clone()),
                state,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            self.call_with(method, uri, token, body, &[]).await
        }

        async fn call_with(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
            extra_headers: &[(&str, &str)],
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            for (name, value) in extra_headers {
                builder = builder.header(*name, *value);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, value)
        }

        async fn register(&self, name: &str, email: &str) -> (String, Uuid) {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    Some(json!({"name": name, "email": email, "password": "secret1"})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
            (body["token"].as_str().unwrap().to_string(), id)
        }

        async fn create_skill(&self, token: &str, coins: i64) -> (StatusCode, Value) {
            self.call(
                Method::POST,
                "/api/skills",
                Some(token),
                Some(json!({
                    "title": "Logo Design",
                    "description": "Clean vector logos",
                    "coins": coins,
                    "category": "Design"
                })),
            )
            .await
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn register_returns_user_without_password() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "Alice", "email": "A@X.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["coins"], 0);
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_bad_request() {
        let app = TestApp::new();
        app.register("Alice", "a@x.com").await;
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "Eve", "email": "a@x.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already registered");
        assert_eq!(body["statusCode"], 400);
    }

    #[tokio::test]
    async fn register_validation_reports_fields() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "Alice", "email": "nope", "password": "123"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["email"][0], "Invalid email address");
        assert_eq!(
            body["errors"]["password"][0],
            "Password must be at least 6 characters"
        );
    }

    #[tokio::test]
    async fn malformed_body_uses_the_envelope() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "a@x.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["errors"]["name"][0], "name is required");
        assert!(!body.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn blank_name_is_rejected_at_register() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "   ", "email": "a@x.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["name"][0], "Name is required");
        assert!(app.state.storage.get_user_by_email("a@x.com").await.is_none());
    }

    #[tokio::test]
    async fn login_checks_credentials() {
        let app = TestApp::new();
        app.register("Alice", "a@x.com").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "A@x.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Alice");

        for (email, password) in [("a@x.com", "wrong-pass"), ("b@x.com", "secret1")] {
            let (status, body) = app
                .call(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({"email": email, "password": password})),
                )
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["message"], "Invalid email or password");
        }
    }

    #[tokio::test]
    async fn me_requires_a_valid_token() {
        let app = TestApp::new();
        let (token, id) = app.register("Alice", "a@x.com").await;

        let (status, body) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.to_string());
        assert!(body.get("password").is_none());

        let (status, body) = app.call(Method::GET, "/api/user/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized - No token provided");

        let (status, body) = app
            .call(Method::GET, "/api/user/me", Some("garbage"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized - Invalid token");
    }

    #[tokio::test]
    async fn token_for_unknown_user_gets_404() {
        let app = TestApp::new();
        let keys = <crate::auth::jwt::JwtKeys as axum::extract::FromRef<AppState>>::from_ref(
            &app.state,
        );
        let token = keys.sign(Uuid::new_v4()).unwrap();

        let (status, _) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.create_skill(&token, 10).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.state.storage.get_skills().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skill_round_trip_exposes_only_public_seller_fields() {
        let app = TestApp::new();
        let (token, alice_id) = app.register("Alice", "a@x.com").await;

        let (status, created) = app.create_skill(&token, 10).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["sellerId"], alice_id.to_string());
        assert!(created["createdAt"].is_string());
        let skill_id = created["id"].as_str().unwrap();

        let (status, listed) = app.call(Method::GET, "/api/skills", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["seller"]["name"], "Alice");

        let (status, one) = app
            .call(Method::GET, &format!("/api/skills/{skill_id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["title"], "Logo Design");
        assert_eq!(
            one["seller"],
            json!({"id": alice_id.to_string(), "name": "Alice", "email": "a@x.com"})
        );
    }

    #[tokio::test]
    async fn unknown_skill_ids_are_404() {
        let app = TestApp::new();
        for uri in [
            format!("/api/skills/{}", Uuid::new_v4()),
            "/api/skills/not-a-uuid".to_string(),
        ] {
            let (status, body) = app.call(Method::GET, &uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "Skill not found");
        }
    }

    #[tokio::test]
    async fn skill_coins_out_of_range_are_rejected_before_storage() {
        let app = TestApp::new();
        let (token, _) = app.register("Alice", "a@x.com").await;

        for coins in [0, 1001] {
            let (status, body) = app.create_skill(&token, coins).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["errors"]["coins"].is_array());
        }
        assert!(app.state.storage.get_skills().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skill_without_title_reports_the_field() {
        let app = TestApp::new();
        let (token, _) = app.register("Alice", "a@x.com").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/skills",
                Some(&token),
                Some(json!({"description": "d", "coins": 5, "category": "c"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"]["title"][0], "title is required");
        assert!(!body.to_string().contains("column"));
        assert!(app.state.storage.get_skills().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skill_coins_as_string_report_the_field() {
        let app = TestApp::new();
        let (token, _) = app.register("Alice", "a@x.com").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/skills",
                Some(&token),
                Some(json!({"title": "t", "description": "d", "coins": "5", "category": "c"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["errors"]["coins"][0].as_str().unwrap();
        assert!(message.starts_with("invalid type"));
        assert!(!message.contains("column"));
    }

    #[tokio::test]
    async fn creating_a_skill_needs_auth() {
        let app = TestApp::new();
        let (status, _) = app
            .call(
                Method::POST,
                "/api/skills",
                None,
                Some(json!({"title": "t", "description": "d", "coins": 5, "category": "c"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_owner_gets_the_same_404_as_a_missing_skill() {
        let app = TestApp::new();
        let (alice, _) = app.register("Alice", "a@x.com").await;
        let (bob, _) = app.register("Bob", "b@x.com").await;
        let (_, created) = app.create_skill(&alice, 10).await;
        let own = format!("/api/skills/{}", created["id"].as_str().unwrap());
        let missing = format!("/api/skills/{}", Uuid::new_v4());

        let patch = json!({"coins": 20});
        let (s1, b1) = app.call(Method::PUT, &own, Some(&bob), Some(patch.clone())).await;
        let (s2, b2) = app.call(Method::PUT, &missing, Some(&bob), Some(patch.clone())).await;
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!((s1, &b1), (s2, &b2));

        let (s1, b1) = app.call(Method::DELETE, &own, Some(&bob), None).await;
        let (s2, b2) = app.call(Method::DELETE, &missing, Some(&bob), None).await;
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!((s1, &b1), (s2, &b2));

        let (status, updated) = app.call(Method::PUT, &own, Some(&alice), Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["coins"], 20);
        assert_eq!(updated["title"], "Logo Design");

        let (status, body) = app.call(Method::DELETE, &own, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "message": "Skill deleted successfully"}));

        let (status, _) = app.call(Method::GET, &own, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_validates_partial_coins() {
        let app = TestApp::new();
        let (alice, _) = app.register("Alice", "a@x.com").await;
        let (_, created) = app.create_skill(&alice, 10).await;
        let uri = format!("/api/skills/{}", created["id"].as_str().unwrap());

        let (status, _) = app
            .call(Method::PUT, &uri, Some(&alice), Some(json!({"coins": 0})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, one) = app.call(Method::GET, &uri, None, None).await;
        assert_eq!(one["coins"], 10);
    }

    #[tokio::test]
    async fn small_exchange_scenario() {
        let app = TestApp::new();
        let (token, alice_id) = app.register("Alice", "a@x.com").await;
        app.state.storage.update_user_coins(alice_id, 10).await.unwrap();

        let (status, body) = app
            .call(
                Method::POST,
                "/api/coins/exchange",
                Some(&token),
                Some(json!({"packageType": "small"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["coins"], 0);
        assert_eq!(body["message"], "Successfully exchanged 10 coins for $25,000");
        assert_eq!(
            body["transaction"],
            json!({"coinsExchanged": 10, "amountReceived": 25000, "remainingCoins": 0})
        );

        let (status, body) = app
            .call(
                Method::POST,
                "/api/coins/exchange",
                Some(&token),
                Some(json!({"packageType": "small"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Insufficient coins"));
        assert_eq!(app.state.storage.get_user(alice_id).await.unwrap().coins, 0);
    }

    #[tokio::test]
    async fn large_exchange_drains_exactly_1000() {
        let app = TestApp::new();
        let (token, alice_id) = app.register("Alice", "a@x.com").await;
        app.state.storage.update_user_coins(alice_id, 1000).await.unwrap();

        let (status, body) = app
            .call(
                Method::POST,
                "/api/coins/exchange",
                Some(&token),
                Some(json!({"packageType": "large"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["coins"], 0);
        assert_eq!(body["transaction"]["amountReceived"], 30000);
    }

    #[tokio::test]
    async fn unknown_package_is_rejected() {
        let app = TestApp::new();
        let (token, _) = app.register("Alice", "a@x.com").await;
        let (status, body) = app
            .call(
                Method::POST,
                "/api/coins/exchange",
                Some(&token),
                Some(json!({"packageType": "medium"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert!(body["errors"]["packageType"][0]
            .as_str()
            .unwrap()
            .contains("unknown variant"));
    }

    #[tokio::test]
    async fn exchange_retry_with_idempotency_key_debits_once() {
        let app = TestApp::new();
        let (token, alice_id) = app.register("Alice", "a@x.com").await;
        app.state.storage.update_user_coins(alice_id, 30).await.unwrap();

        let mut bodies = Vec::new();
        for _ in 0..2 {
            let (status, body) = app
                .call_with(
                    Method::POST,
                    "/api/coins/exchange",
                    Some(&token),
                    Some(json!({"packageType": "small"})),
                    &[("Idempotency-Key", "order-42")],
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            bodies.push(body);
        }
        assert_eq!(bodies[0]["transaction"], bodies[1]["transaction"]);
        assert_eq!(app.state.storage.get_user(alice_id).await.unwrap().coins, 20);
    }

    #[tokio::test]
    async fn rates_are_public() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/api/coins/rates", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "small": {"coins": 10, "price": 25000},
                "large": {"coins": 1000, "price": 30000}
            })
        );
    }
}
