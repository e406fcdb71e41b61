use crate::models::{decode_todo_items, TodoItem, TodoKeys, UpdateExpression, TODO_SORT_KEY_PREFIX};
use crate::DynamoDbClient;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use chrono::{DateTime, Utc};
use domain::{NewTodo, Todo, TodoChanges, TodoError, TodoId};
use tracing::debug;

/// ドキュメントストアの最小抽象
///
/// 各操作は 1 ドキュメントに対する 1 回のリクエストで完結する。
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// 新しい ID を採番して保存し、保存したレコードを返す
    async fn insert(&self, new: NewTodo, created_at: DateTime<Utc>) -> Result<Todo, TodoError>;

    /// コレクション内の全件（ID 昇順）
    async fn find_all(&self) -> Result<Vec<Todo>, TodoError>;

    async fn find_one(&self, todo_id: &TodoId) -> Result<Option<Todo>, TodoError>;

    /// 存在するレコードにだけ変更を適用し、更新後のレコードを返す
    async fn update_one(
        &self,
        todo_id: &TodoId,
        changes: &TodoChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Todo>, TodoError>;

    /// 削除できた場合のみ true
    async fn delete_one(&self, todo_id: &TodoId) -> Result<bool, TodoError>;
}

/// DynamoDB 実装
#[derive(Debug, Clone)]
pub struct DynamoTodoStore {
    db: DynamoDbClient,
    page_size: Option<i32>,
}

impl DynamoTodoStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db, page_size: None }
    }

    /// Query 1 回あたりの取得件数の上限（未指定なら DynamoDB の既定）
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn keys(&self, todo_id: &TodoId) -> TodoKeys {
        TodoKeys::for_todo(self.db.collection(), todo_id)
    }
}

#[async_trait]
impl TodoStore for DynamoTodoStore {
    async fn insert(&self, new: NewTodo, created_at: DateTime<Utc>) -> Result<Todo, TodoError> {
        let item = TodoItem::new(
            self.db.collection(),
            Todo::from_new(TodoId::new(), new, created_at),
        );

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item.to_attribute_map()))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(|e| self.db.convert_error("PutItem", e))?;

        debug!(todo_id = %item.todo.id, "Todo を保存しました");
        Ok(item.todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, TodoError> {
        let pk = TodoKeys::partition(self.db.collection());
        let mut todos = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(pk.clone()))
                .expression_attribute_values(
                    ":sk_prefix",
                    AttributeValue::S(TODO_SORT_KEY_PREFIX.to_string()),
                )
                .consistent_read(true)
                .set_limit(self.page_size)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.db.convert_error("Query", e))?;

            todos.extend(decode_todo_items(output.items())?);

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!("Todo 取得完了: {} 件", todos.len());
        Ok(todos)
    }

    async fn find_one(&self, todo_id: &TodoId) -> Result<Option<Todo>, TodoError> {
        let output = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(self.keys(todo_id).to_key_map()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| self.db.convert_error("GetItem", e))?;

        output
            .item()
            .map(TodoItem::from_attribute_map)
            .transpose()
            .map_err(TodoError::Internal)
    }

    async fn update_one(
        &self,
        todo_id: &TodoId,
        changes: &TodoChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Todo>, TodoError> {
        let plan = UpdateExpression::build(changes, &updated_at);

        let result = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .set_key(Some(self.keys(todo_id).to_key_map()))
            .update_expression(plan.expression)
            .set_expression_attribute_names(Some(plan.names))
            .set_expression_attribute_values(Some(plan.values))
            .condition_expression("attribute_exists(PK)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                let attributes = output.attributes().ok_or_else(|| {
                    TodoError::Internal("UpdateItem returned no attributes".to_string())
                })?;
                TodoItem::from_attribute_map(attributes)
                    .map(Some)
                    .map_err(TodoError::Internal)
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                debug!(todo_id = %todo_id, "更新対象の Todo が存在しません");
                Ok(None)
            }
            Err(e) => Err(self.db.convert_error("UpdateItem", e)),
        }
    }

    async fn delete_one(&self, todo_id: &TodoId) -> Result<bool, TodoError> {
        let output = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(self.keys(todo_id).to_key_map()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| self.db.convert_error("DeleteItem", e))?;

        Ok(output.attributes().is_some())
    }
}
