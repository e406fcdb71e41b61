use thiserror::Error;

/// ドメインの値検証で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Invalid due date: {0}")]
    InvalidDueDate(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field must not be empty: {0}")]
    EmptyField(String),
}

/// ストア操作の失敗（呼び出し元で回復しない）
#[derive(Debug, Clone, Error)]
pub enum TodoError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
