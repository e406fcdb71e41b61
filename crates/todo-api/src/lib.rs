//! Todo の HTTP API（axum）
//!
//! リクエストの検証とステータスコードへの対応付けだけを担い、
//! データアクセスは `TodoRepository` に委ねる。

pub mod error;
pub mod handlers;
pub mod models;

use axum::{routing::get, Router};
use infrastructure::TodoRepository;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub repo: TodoRepository,
}

/// ルータを構築して返す
pub fn app(repo: TodoRepository) -> Router {
    app_with_state(AppState { repo })
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/:id",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use chrono::{DateTime, Utc};
    use domain::{NewTodo, Todo, TodoChanges, TodoError, TodoId};
    use infrastructure::TodoStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn buy_milk() -> Value {
        json!({"title": "Buy milk", "description": "2%, whole", "due_date": "2024-01-15"})
    }

    #[tokio::test]
    async fn get_health_returns_ok() {
        let app = app(TodoRepository::in_memory());

        let (status, json) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn get_root_describes_endpoints() {
        let app = app(TodoRepository::in_memory());

        let (status, json) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Todo API is running");
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["endpoints"]["POST /todos"], "Create a new todo");
        assert_eq!(json["endpoints"].as_object().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn post_todos_returns_201_with_record() {
        let app = app(TodoRepository::in_memory());

        let (status, json) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["title"], "Buy milk");
        assert_eq!(json["description"], "2%, whole");
        assert_eq!(json["due_date"], "2024-01-15T00:00:00");
        assert_eq!(json["is_completed"], false);
        assert_eq!(json["created_at"], json["updated_at"]);

        let id = json["id"].as_str().unwrap();
        assert!(TodoId::parse(id).is_ok());
    }

    #[tokio::test]
    async fn post_todos_without_due_date_is_rejected() {
        let app = app(TodoRepository::in_memory());

        let body = json!({"title": "Buy milk", "description": "2%, whole"});
        let (status, json) = send(&app, "POST", "/todos", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Missing required field: due_date"}));

        // 何も作成されていない
        let (_, list) = send(&app, "GET", "/todos", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn post_todos_rejects_invalid_date_and_json() {
        let app = app(TodoRepository::in_memory());

        let body = json!({"title": "a", "description": "b", "due_date": "tomorrow"});
        let (status, json) = send(&app, "POST", "/todos", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid date format for due_date");

        let request = Request::builder()
            .method("POST")
            .uri("/todos")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn get_todos_lists_created_items() {
        let app = app(TodoRepository::in_memory());

        let (_, first) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        let body = json!({"title": "Walk dog", "description": "park", "due_date": "2024-01-16"});
        let (_, second) = send(&app, "POST", "/todos", Some(body)).await;

        let (status, json) = send(&app, "GET", "/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([first, second]));
    }

    #[tokio::test]
    async fn get_todo_by_id_round_trips() {
        let app = app(TodoRepository::in_memory());
        let (_, created) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        let uri = format!("/todos/{}", created["id"].as_str().unwrap());

        let (status, json) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, created);
    }

    #[tokio::test]
    async fn unknown_or_malformed_id_returns_404() {
        let app = app(TodoRepository::in_memory());
        let unknown = format!("/todos/{}", TodoId::new());

        for uri in [unknown.as_str(), "/todos/bogus-id"] {
            let (status, json) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json, json!({"error": "Todo not found"}));

            let (status, json) =
                send(&app, "PUT", uri, Some(json!({"is_completed": true}))).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json, json!({"error": "Todo not found or update failed"}));

            let (status, json) = send(&app, "DELETE", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json, json!({"error": "Todo not found or delete failed"}));
        }
    }

    #[tokio::test]
    async fn put_todo_applies_partial_update() {
        let app = app(TodoRepository::in_memory());
        let (_, created) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        let uri = format!("/todos/{}", created["id"].as_str().unwrap());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (status, json) = send(&app, "PUT", &uri, Some(json!({"is_completed": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_completed"], true);
        assert_eq!(json["title"], created["title"]);
        assert_eq!(json["created_at"], created["created_at"]);

        let before: DateTime<Utc> = created["updated_at"].as_str().unwrap().parse().unwrap();
        let after: DateTime<Utc> = json["updated_at"].as_str().unwrap().parse().unwrap();
        assert!(after > before);
    }

    #[tokio::test]
    async fn put_todo_strips_unknown_keys() {
        let app = app(TodoRepository::in_memory());
        let (_, created) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        let uri = format!("/todos/{}", created["id"].as_str().unwrap());

        let body = json!({"title": "X", "created_at": "1999-01-01T00:00:00Z", "id": "other"});
        let (status, json) = send(&app, "PUT", &uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "X");
        assert_eq!(json["id"], created["id"]);
        assert_eq!(json["created_at"], created["created_at"]);

        let (status, json) = send(&app, "PUT", &uri, Some(json!({"owner": "me"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "No valid fields to update"}));
    }

    #[tokio::test]
    async fn delete_todo_removes_record() {
        let app = app(TodoRepository::in_memory());
        let (_, created) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        let uri = format!("/todos/{}", created["id"].as_str().unwrap());

        let (status, json) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"message": "Todo deleted successfully"}));

        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    /// 常に失敗するストア
    struct UnavailableStore;

    #[async_trait]
    impl TodoStore for UnavailableStore {
        async fn insert(&self, _: NewTodo, _: DateTime<Utc>) -> Result<Todo, TodoError> {
            Err(TodoError::DynamoDb("connection refused".to_string()))
        }
        async fn find_all(&self) -> Result<Vec<Todo>, TodoError> {
            Err(TodoError::DynamoDb("connection refused".to_string()))
        }
        async fn find_one(&self, _: &TodoId) -> Result<Option<Todo>, TodoError> {
            Err(TodoError::DynamoDb("connection refused".to_string()))
        }
        async fn update_one(
            &self,
            _: &TodoId,
            _: &TodoChanges,
            _: DateTime<Utc>,
        ) -> Result<Option<Todo>, TodoError> {
            Err(TodoError::DynamoDb("connection refused".to_string()))
        }
        async fn delete_one(&self, _: &TodoId) -> Result<bool, TodoError> {
            Err(TodoError::DynamoDb("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_returns_generic_500() {
        let app = app(TodoRepository::new(Arc::new(UnavailableStore)));

        let (status, json) = send(&app, "GET", "/todos", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal server error"}));

        let (status, _) = send(&app, "POST", "/todos", Some(buy_milk())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
