use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{DueDate, Todo, TodoChanges, TodoError, TodoId};
use std::collections::HashMap;
use tracing::error;

pub const ENTITY_TYPE_TODO: &str = "Todo";
pub const TODO_SORT_KEY_PREFIX: &str = "TODO#";

/// Single Table Design のキー構造
/// コレクションごとに 1 パーティション、Todo ごとに 1 ソートキー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoKeys {
    pub pk: String,
    pub sk: String,
}

impl TodoKeys {
    pub fn for_todo(collection: &str, todo_id: &TodoId) -> Self {
        Self {
            pk: Self::partition(collection),
            sk: format!("{TODO_SORT_KEY_PREFIX}{todo_id}"),
        }
    }

    /// コレクションのパーティションキー
    pub fn partition(collection: &str) -> String {
        format!("COLLECTION#{collection}")
    }

    pub fn to_key_map(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk.clone())),
            ("SK".to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }
}

/// DynamoDB 上の Todo アイテム
#[derive(Debug, Clone)]
pub struct TodoItem {
    pub keys: TodoKeys,
    pub todo: Todo,
}

impl TodoItem {
    pub fn new(collection: &str, todo: Todo) -> Self {
        Self {
            keys: TodoKeys::for_todo(collection, &todo.id),
            todo,
        }
    }

    /// DynamoDB AttributeValue マップに変換
    pub fn to_attribute_map(&self) -> HashMap<String, AttributeValue> {
        let todo = &self.todo;
        let mut map = self.keys.to_key_map();

        map.insert(
            "EntityType".to_string(),
            AttributeValue::S(ENTITY_TYPE_TODO.to_string()),
        );
        map.insert("id".to_string(), AttributeValue::S(todo.id.to_string()));
        map.insert("title".to_string(), AttributeValue::S(todo.title.clone()));
        map.insert(
            "description".to_string(),
            AttributeValue::S(todo.description.clone()),
        );
        map.insert(
            "due_date".to_string(),
            AttributeValue::S(todo.due_date.to_string()),
        );
        map.insert(
            "is_completed".to_string(),
            AttributeValue::Bool(todo.is_completed),
        );
        map.insert(
            "created_at".to_string(),
            AttributeValue::S(format_timestamp(&todo.created_at)),
        );
        map.insert(
            "updated_at".to_string(),
            AttributeValue::S(format_timestamp(&todo.updated_at)),
        );

        map
    }

    /// DynamoDB AttributeValue マップから Todo を復元
    pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Todo, String> {
        let id = TodoId::parse(get_s(map, "id")?).map_err(|e| e.to_string())?;
        let due_date = DueDate::parse(get_s(map, "due_date")?).map_err(|e| e.to_string())?;

        let is_completed = *map
            .get("is_completed")
            .and_then(|v| v.as_bool().ok())
            .ok_or("Missing or invalid is_completed")?;

        Ok(Todo {
            id,
            title: get_s(map, "title")?.clone(),
            description: get_s(map, "description")?.clone(),
            due_date,
            is_completed,
            created_at: parse_timestamp(get_s(map, "created_at")?)?,
            updated_at: parse_timestamp(get_s(map, "updated_at")?)?,
        })
    }
}

/// Query 結果のアイテム群を復元する。1 件でも壊れていれば全体を失敗とする
pub fn decode_todo_items(items: &[HashMap<String, AttributeValue>]) -> Result<Vec<Todo>, TodoError> {
    items
        .iter()
        .map(|item| {
            TodoItem::from_attribute_map(item).map_err(|e| {
                let sk = item.get("SK").and_then(|v| v.as_s().ok()).map(String::as_str);
                error!(sk = ?sk, error = %e, "Todo アイテムの復元に失敗しました");
                TodoError::Internal(e)
            })
        })
        .collect()
}

/// UpdateItem 用の SET 式と属性名・値
#[derive(Debug, Clone)]
pub struct UpdateExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    /// updated_at は常に含める。それ以外は指定されたフィールドのみ
    pub fn build(changes: &TodoChanges, updated_at: &DateTime<Utc>) -> Self {
        let mut plan = Self {
            expression: String::new(),
            names: HashMap::new(),
            values: HashMap::new(),
        };
        let mut parts = Vec::new();

        let mut set = |name: &str, value: AttributeValue| {
            parts.push(format!("#{name} = :{name}"));
            plan.names.insert(format!("#{name}"), name.to_string());
            plan.values.insert(format!(":{name}"), value);
        };

        set("updated_at", AttributeValue::S(format_timestamp(updated_at)));
        if let Some(title) = &changes.title {
            set("title", AttributeValue::S(title.clone()));
        }
        if let Some(description) = &changes.description {
            set("description", AttributeValue::S(description.clone()));
        }
        if let Some(due_date) = &changes.due_date {
            set("due_date", AttributeValue::S(due_date.to_string()));
        }
        if let Some(is_completed) = changes.is_completed {
            set("is_completed", AttributeValue::Bool(is_completed));
        }

        plan.expression = format!("SET {}", parts.join(", "));
        plan
    }
}

/// マイクロ秒精度の RFC 3339（Z 表記）
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp {value}: {e}"))
}

fn get_s<'a>(map: &'a HashMap<String, AttributeValue>, key: &str) -> Result<&'a String, String> {
    map.get(key)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| format!("Missing {key}"))
}
