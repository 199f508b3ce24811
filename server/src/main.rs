use ntex::web;
use paperclip_hunt_server::config::{Config, StoreBackend};
use paperclip_hunt_server::db::Db;
use paperclip_hunt_server::state::AppState;
use paperclip_hunt_server::store::{MemoryStore, SqliteStore, Store};
use paperclip_hunt_server::{handlers, identity, services};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn open_store(config: &Config) -> std::io::Result<Arc<dyn Store>> {
    Ok(match config.backend {
        StoreBackend::Sqlite => {
            let db = Db::open(&config.database_path, config.store_timeout)
                .map_err(std::io::Error::other)?;
            Arc::new(SqliteStore::new(db))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    })
}

fn spawn_cleanup(store: Arc<dyn Store>, config: Arc<Config>) {
    ntex::rt::spawn(async move {
        let mut interval = tokio::time::interval(config.cleanup_interval);
        loop {
            interval.tick().await;
            let store = store.clone();
            let (ttl, retention) = (config.policy.session_ttl, config.rate_limit_retention);
            let task = tokio::task::spawn_blocking(move || {
                services::maintenance::run_cleanup(store.as_ref(), chrono::Utc::now(), ttl, retention)
            });
            if let Err(e) = task.await {
                tracing::warn!("cleanup task failed: {}", e);
            }
        }
    });
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperclip_hunt_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let salt: Arc<str> = match &config.ip_hash_salt {
        Some(salt) => salt.as_str().into(),
        None => {
            tracing::warn!("IP_HASH_SALT not set, using a random salt for this process");
            identity::random_salt().into()
        }
    };

    let store = open_store(&config)?;
    let config = Arc::new(config);
    let bind = format!("{}:{}", config.host, config.port);

    spawn_cleanup(store.clone(), config.clone());

    let state = AppState {
        store,
        config: config.clone(),
        salt,
    };

    tracing::info!(
        "Paperclip Hunt server starting on {} ({:?} store)",
        bind,
        config.backend
    );

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntex::http::StatusCode;
    use ntex::web::test;
    use serde_json::{json, Value};

    fn test_state(config: Config) -> AppState {
        let db = Db::open_in_memory().unwrap();
        AppState {
            store: Arc::new(SqliteStore::new(db)),
            config: Arc::new(config),
            salt: "test-salt".into(),
        }
    }

    async fn json_body(resp: web::WebResponse) -> Value {
        serde_json::from_slice(&test::read_body(resp).await).unwrap()
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                web::App::new()
                    .state($state)
                    .configure(handlers::configure),
            )
            .await
        };
    }

    #[test]
    fn test_db_open_in_memory() {
        let db = Db::open_in_memory().expect("Failed to open in-memory DB");
        db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('sessions', 'rate_limits', 'leaderboard')",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 3);
            Ok(())
        })
        .unwrap();
    }

    #[ntex::test]
    async fn test_health() {
        let app = app!(test_state(Config::default()));
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_start_game_requires_client_id() {
        let app = app!(test_state(Config::default()));
        let req = test::TestRequest::post()
            .uri("/api/start-game")
            .set_json(&json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = json_body(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Missing client ID"));
    }

    #[ntex::test]
    async fn test_malformed_bodies_get_json_errors() {
        let app = app!(test_state(Config::default()));

        let req = test::TestRequest::post()
            .uri("/api/start-game")
            .set_json(&json!({ "clientId": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body, json!({ "success": false, "error": "Missing client ID" }));

        let req = test::TestRequest::post()
            .uri("/api/submit-score")
            .set_json(&json!({
                "initials": 123,
                "survivalTime": 42,
                "sessionToken": "tok",
                "clientId": "abc",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("initials must be a string"));

        // no content type, not JSON
        let req = test::TestRequest::post()
            .uri("/api/submit-score")
            .set_payload("initials=AAA&survivalTime=42")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body, json!({ "success": false, "error": "Invalid JSON body" }));

        // no content type, valid JSON
        let req = test::TestRequest::post()
            .uri("/api/start-game")
            .set_payload(r#"{"clientId":"abc"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["success"], json!(true));
    }

    #[ntex::test]
    async fn test_play_submit_and_retry() {
        let app = app!(test_state(Config::default()));

        let req = test::TestRequest::post()
            .uri("/api/start-game")
            .set_json(&json!({ "clientId": "abc" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = json_body(resp).await;
        assert_eq!(body["success"], json!(true));
        let token = body["token"].as_str().unwrap().to_string();

        let submit = json!({
            "initials": "AAA",
            "survivalTime": 42,
            "sessionToken": token,
            "clientId": "abc",
        });
        let req = test::TestRequest::post()
            .uri("/api/submit-score")
            .header("x-forwarded-for", "198.51.100.4")
            .set_json(&submit)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = json_body(resp).await;
        assert_eq!(body, json!({ "success": true, "rank": 1 }));

        let req = test::TestRequest::post()
            .uri("/api/submit-score")
            .header("x-forwarded-for", "198.51.100.4")
            .set_json(&submit)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = json_body(resp).await;
        assert_eq!(body["error"], json!("Session token already used"));

        let req = test::TestRequest::get().uri("/api/leaderboard").to_request();
        let resp = test::call_service(&app, req).await;
        let board: Value = json_body(resp).await;
        assert_eq!(board.as_array().unwrap().len(), 1);
        assert_eq!(board[0]["initials"], json!("AAA"));
        assert_eq!(board[0]["survivalTime"], json!(42));
        assert!(board[0]["createdAt"].is_string());
    }

    #[ntex::test]
    async fn test_submit_status_codes() {
        let state = test_state(Config::default());
        let token = services::session::create_session(
            state.store.as_ref(),
            "abc",
            chrono::Utc::now(),
        )
        .unwrap();
        let app = app!(state);

        let cases = [
            (json!({ "initials": "AAA", "survivalTime": 42 }), StatusCode::BAD_REQUEST),
            (
                json!({ "initials": "AAA", "survivalTime": 10000, "sessionToken": token, "clientId": "abc" }),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({ "initials": "AAA", "survivalTime": 42, "sessionToken": "nope", "clientId": "abc" }),
                StatusCode::UNAUTHORIZED,
            ),
            (
                json!({ "initials": "AAA", "survivalTime": 42, "sessionToken": token, "clientId": "xyz" }),
                StatusCode::UNAUTHORIZED,
            ),
            // legacy field names
            (
                json!({ "initials": "AAA", "time": 42, "token": token, "clientId": "abc" }),
                StatusCode::OK,
            ),
        ];
        for (body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/api/submit-score")
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected, "body: {}", body);
        }
    }

    #[ntex::test]
    async fn test_rate_limit_and_duplicate_over_http() {
        let state = test_state(Config::default());
        let store = state.store.clone();
        let app = app!(state);
        let now = chrono::Utc::now();

        let submit = |time: i64| {
            let token = services::session::create_session(store.as_ref(), "abc", now).unwrap();
            test::TestRequest::post()
                .uri("/api/submit-score")
                .header("cf-connecting-ip", "203.0.113.9")
                .set_json(&json!({
                    "initials": "BOB",
                    "survivalTime": time,
                    "sessionToken": token,
                    "clientId": "abc",
                }))
                .to_request()
        };

        let resp = test::call_service(&app, submit(30)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = test::call_service(&app, submit(30)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        for time in 31..35 {
            let resp = test::call_service(&app, submit(time)).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = test::call_service(&app, submit(99)).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = json_body(resp).await;
        assert_eq!(body["success"], json!(false));
    }

    #[ntex::test]
    async fn test_leaderboard_top_ten_and_user_rank() {
        let state = test_state(Config::default());
        let now = chrono::Utc::now();
        for t in 1..=12 {
            services::leaderboard::insert(state.store.as_ref(), "ZZZ", t * 10, "h", now).unwrap();
        }
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/leaderboard").to_request();
        let board: Value = json_body(test::call_service(&app, req).await).await;
        let times: Vec<i64> = board
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["survivalTime"].as_i64().unwrap())
            .collect();
        assert_eq!(times.len(), 10);
        assert_eq!(times[0], 120);
        assert!(times.windows(2).all(|w| w[0] > w[1]));

        let req = test::TestRequest::get().uri("/api/user-rank/ZZZ/95").to_request();
        let body: Value = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body, json!({ "rank": 4 }));

        let req = test::TestRequest::get().uri("/api/user-rank/ZZZ/0").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
