use crate::{DynamoDbClient, DynamoTodoStore, InMemoryTodoStore, TodoStore};
use chrono::{DateTime, SubsecRound, Utc};
use domain::{NewTodo, Todo, TodoChanges, TodoError, TodoId};
use shared::Config;
use std::sync::Arc;
use tracing::{debug, info};

/// Todo リポジトリ
///
/// HTTP と CLI の双方から同じ形で利用する唯一のデータアクセス窓口。
/// ID の文字列変換とタイムスタンプの打刻はここで行う。
/// 不正な形式の ID は「存在しない」と同じ結果になる。
#[derive(Clone)]
pub struct TodoRepository {
    store: Arc<dyn TodoStore>,
}

impl TodoRepository {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// DynamoDB に接続したリポジトリを構築（接続失敗はそのまま返す）
    pub async fn connect(config: &Config) -> Result<Self, TodoError> {
        let db = DynamoDbClient::connect(config).await?;
        Ok(Self::new(Arc::new(DynamoTodoStore::new(db))))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTodoStore::new()))
    }

    pub async fn create(&self, new: NewTodo) -> Result<Todo, TodoError> {
        let todo = self.store.insert(new, current_timestamp()).await?;
        info!(todo_id = %todo.id, "Todo を作成しました");
        Ok(todo)
    }

    pub async fn get_all(&self) -> Result<Vec<Todo>, TodoError> {
        self.store.find_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Todo>, TodoError> {
        let Some(todo_id) = decode_id(id) else {
            return Ok(None);
        };
        self.store.find_one(&todo_id).await
    }

    /// updated_at は変更内容が空でも必ず書き換える
    pub async fn update(&self, id: &str, changes: TodoChanges) -> Result<Option<Todo>, TodoError> {
        let Some(todo_id) = decode_id(id) else {
            return Ok(None);
        };

        let updated = self
            .store
            .update_one(&todo_id, &changes, current_timestamp())
            .await?;

        match &updated {
            Some(todo) => info!(todo_id = %todo.id, fields = ?changes.fields(), "Todo を更新しました"),
            None => debug!(todo_id = %todo_id, "更新対象の Todo が見つかりません"),
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, TodoError> {
        let Some(todo_id) = decode_id(id) else {
            return Ok(false);
        };

        let deleted = self.store.delete_one(&todo_id).await?;
        if deleted {
            info!(todo_id = %todo_id, "Todo を削除しました");
        }
        Ok(deleted)
    }
}

fn decode_id(id: &str) -> Option<TodoId> {
    match TodoId::parse(id) {
        Ok(todo_id) => Some(todo_id),
        Err(e) => {
            debug!(todo_id = id, error = %e, "不正な形式の ID のため未検出として扱います");
            None
        }
    }
}

/// ストアの保存精度（マイクロ秒）に揃えた現在時刻
fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
