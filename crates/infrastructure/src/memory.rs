use crate::store::TodoStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{NewTodo, Todo, TodoChanges, TodoError, TodoId};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// 簡易な InMemory 実装（開発/テスト用）
#[derive(Debug, Default)]
pub struct InMemoryTodoStore {
    todos: RwLock<BTreeMap<TodoId, Todo>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, new: NewTodo, created_at: DateTime<Utc>) -> Result<Todo, TodoError> {
        let mut todos = self.todos.write().await;
        let mut todo_id = TodoId::new();
        while todos.contains_key(&todo_id) {
            todo_id = TodoId::new();
        }

        let todo = Todo::from_new(todo_id, new, created_at);
        todos.insert(todo_id, todo.clone());
        Ok(todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, TodoError> {
        Ok(self.todos.read().await.values().cloned().collect())
    }

    async fn find_one(&self, todo_id: &TodoId) -> Result<Option<Todo>, TodoError> {
        Ok(self.todos.read().await.get(todo_id).cloned())
    }

    async fn update_one(
        &self,
        todo_id: &TodoId,
        changes: &TodoChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Todo>, TodoError> {
        let mut todos = self.todos.write().await;
        Ok(todos.get_mut(todo_id).map(|todo| {
            changes.apply_to(todo, updated_at);
            todo.clone()
        }))
    }

    async fn delete_one(&self, todo_id: &TodoId) -> Result<bool, TodoError> {
        Ok(self.todos.write().await.remove(todo_id).is_some())
    }
}
