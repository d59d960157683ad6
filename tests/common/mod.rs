#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use questlog::import::{CatalogFile, import_catalog};
use questlog::server::{AppState, create_router};
use questlog::store::{SqliteStore, Store};

pub const CATALOG: &str = r#"
[[users]]
id = "ada"
name = "Ada"

[[users]]
id = "bob"
name = "Bob"

[[games]]
id = "hollow"
name = "Hollow Depths"

[[games]]
id = "skyline"
name = "Skyline Drift"

[[platforms]]
id = "pc"
name = "PC"

[[additions]]
id = "abyss"
game_id = "hollow"
name = "The Abyss"
weight = 1.0
required_for_full = true
addition_type = "dlc"

[[additions]]
id = "gilded"
game_id = "hollow"
name = "Gilded Halls"
required_for_full = true
addition_type = "dlc"

[[additions]]
id = "hollow-goty"
game_id = "hollow"
name = "Game of the Year Edition"
addition_type = "edition"
is_complete_edition = true

[[additions]]
id = "skyline-pass"
game_id = "skyline"
name = "Season Pass"
required_for_full = true
addition_type = "dlc"

[[owned_additions]]
user_id = "ada"
game_id = "hollow"
platform_id = "pc"
addition_id = "abyss"

[[achievements]]
user_id = "bob"
game_id = "skyline"
total = 10
completed = 5
"#;

pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("questlog.db")).expect("open store");
        store.initialize().expect("initialize schema");
        import_catalog(&store, CatalogFile::parse(CATALOG).expect("parse catalog"))
            .expect("import catalog");

        let store = Arc::new(store);
        let router = create_router(Arc::new(AppState::new(store.clone())));

        Self {
            temp_dir,
            store,
            router,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn log(&self, user: &str, game: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/api/v1/games/{game}/platforms/pc/completion/logs"),
            Some(user),
            Some(body),
        )
        .await
    }
}
