//! リクエスト本文の検証
//!
//! 必須項目・型・空文字・日付形式の検証はすべてこの層で行い、
//! リポジトリには検証済みの値だけを渡す。

use crate::error::ApiError;
use domain::{require_text, DueDate, NewTodo, TodoChanges, TodoField};
use serde_json::{Map, Value};

/// POST /todos で必須の項目（検査順）
const REQUIRED_FIELDS: [TodoField; 3] = [TodoField::Title, TodoField::Description, TodoField::DueDate];

/// 本文を JSON オブジェクトとして読む
pub fn parse_json_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

/// POST /todos の本文から作成内容を組み立てる
pub fn parse_create_request(body: &[u8]) -> Result<NewTodo, ApiError> {
    let data = parse_json_object(body)?;

    for field in REQUIRED_FIELDS {
        if !data.contains_key(field.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Missing required field: {field}"
            )));
        }
    }

    let title = text_value(&data, TodoField::Title)?.unwrap_or_default();
    let description = text_value(&data, TodoField::Description)?.unwrap_or_default();
    let due_date = date_value(&data)?
        .ok_or_else(|| ApiError::BadRequest("Missing required field: due_date".to_string()))?;
    let is_completed = flag_value(&data)?.unwrap_or(false);

    Ok(NewTodo::new(title, description, due_date).completed(is_completed))
}

/// PUT /todos/:id の本文から変更内容を組み立てる
/// 許可リスト外のキーは黙って取り除く
pub fn parse_update_request(body: &[u8]) -> Result<TodoChanges, ApiError> {
    let data = parse_json_object(body)?;

    let changes = TodoChanges {
        title: text_value(&data, TodoField::Title)?,
        description: text_value(&data, TodoField::Description)?,
        due_date: date_value(&data)?,
        is_completed: flag_value(&data)?,
    };

    if changes.is_empty() {
        return Err(ApiError::BadRequest("No valid fields to update".to_string()));
    }
    Ok(changes)
}

fn invalid_value(field: TodoField) -> ApiError {
    ApiError::BadRequest(format!("Invalid value for field: {field}"))
}

fn string_value(data: &Map<String, Value>, field: TodoField) -> Result<Option<&str>, ApiError> {
    match data.get(field.as_str()) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(invalid_value(field)),
    }
}

fn text_value(data: &Map<String, Value>, field: TodoField) -> Result<Option<String>, ApiError> {
    string_value(data, field)?
        .map(|value| require_text(field, value))
        .transpose()
        .map_err(ApiError::from)
}

fn date_value(data: &Map<String, Value>) -> Result<Option<DueDate>, ApiError> {
    string_value(data, TodoField::DueDate)?
        .map(DueDate::parse)
        .transpose()
        .map_err(ApiError::from)
}

fn flag_value(data: &Map<String, Value>) -> Result<Option<bool>, ApiError> {
    match data.get(TodoField::IsCompleted.as_str()) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(invalid_value(TodoField::IsCompleted)),
    }
}
