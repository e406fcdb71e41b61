use crate::due_date::DueDate;
use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use ulid::{Generator, Ulid};

/// プロセス全体で共有する ULID 生成器（同一ミリ秒内でも単調増加）
static ID_GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

/// Todo の識別子
///
/// 内部表現は ULID。外部へは 26 文字の文字列としてのみ公開する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(Ulid);

impl TodoId {
    /// 採番順に昇順となる ID を発行する
    pub fn new() -> Self {
        let mut generator = ID_GENERATOR
            .get_or_init(|| Mutex::new(Generator::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // 同一ミリ秒内で乱数部が桁あふれした場合のみ通常の生成に戻す
        Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }

    /// 文字列から TodoId を復元する。ULID として不正なら `InvalidTodoId`
    pub fn parse(id: &str) -> Result<Self, DomainError> {
        Ulid::from_string(id)
            .map(Self)
            .map_err(|_| DomainError::InvalidTodoId(id.to_string()))
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TodoId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub due_date: DueDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// 新規作成時のレコードを組み立てる（created_at == updated_at）
    pub fn from_new(id: TodoId, new: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            is_completed: new.is_completed,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 作成リクエスト（検証済みの値のみを保持）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub due_date: DueDate,
    pub is_completed: bool,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, description: impl Into<String>, due_date: DueDate) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date,
            is_completed: false,
        }
    }

    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }
}

/// 更新可能なフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TodoField {
    Title,
    Description,
    DueDate,
    IsCompleted,
}

impl TodoField {
    pub const ALL: [TodoField; 4] = [
        TodoField::Title,
        TodoField::Description,
        TodoField::DueDate,
        TodoField::IsCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoField::Title => "title",
            TodoField::Description => "description",
            TodoField::DueDate => "due_date",
            TodoField::IsCompleted => "is_completed",
        }
    }

    /// "title, description, due_date, is_completed"
    pub fn allowed_names() -> String {
        Self::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for TodoField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DomainError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for TodoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 部分更新の内容。指定されたフィールドだけが書き換わる
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DueDate>,
    pub is_completed: Option<bool>,
}

impl TodoChanges {
    pub fn completion(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }

    /// CLI のように文字列で渡された単一フィールドの更新を組み立てる
    pub fn from_raw(field: TodoField, value: &str) -> Result<Self, DomainError> {
        let mut changes = Self::default();
        match field {
            TodoField::Title => changes.title = Some(require_text(field, value)?),
            TodoField::Description => changes.description = Some(require_text(field, value)?),
            TodoField::DueDate => changes.due_date = Some(DueDate::parse(value)?),
            TodoField::IsCompleted => changes.is_completed = Some(parse_flag(value)),
        }
        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// 指定されているフィールド一覧
    pub fn fields(&self) -> Vec<TodoField> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push(TodoField::Title);
        }
        if self.description.is_some() {
            fields.push(TodoField::Description);
        }
        if self.due_date.is_some() {
            fields.push(TodoField::DueDate);
        }
        if self.is_completed.is_some() {
            fields.push(TodoField::IsCompleted);
        }
        fields
    }

    /// 変更を適用し、updated_at を進める
    pub fn apply_to(&self, todo: &mut Todo, updated_at: DateTime<Utc>) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = description.clone();
        }
        if let Some(due_date) = &self.due_date {
            todo.due_date = due_date.clone();
        }
        if let Some(is_completed) = self.is_completed {
            todo.is_completed = is_completed;
        }
        todo.updated_at = updated_at;
    }
}

/// `true` / `yes` / `1`（大文字小文字を区別しない）のみを真とみなす
pub fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1")
}

/// 空白のみの文字列を拒否する
pub fn require_text(field: TodoField, value: &str) -> Result<String, DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::EmptyField(field.as_str().to_string()));
    }
    Ok(value.to_string())
}
