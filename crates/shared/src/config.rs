use http::Uri;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const STORE_URI_KEY: &str = "DYNAMODB_ENDPOINT";
pub const DATABASE_NAME_KEY: &str = "DYNAMODB_TABLE";
pub const COLLECTION_NAME_KEY: &str = "TODO_COLLECTION";
pub const AWS_REGION_KEY: &str = "AWS_REGION";
pub const ENVIRONMENT_KEY: &str = "ENVIRONMENT";
pub const BIND_ADDR_KEY: &str = "API_BIND_ADDR";

pub const DEFAULT_DATABASE_NAME: &str = "todo_db";
pub const DEFAULT_COLLECTION_NAME: &str = "todos";
pub const DEFAULT_AWS_REGION: &str = "ap-northeast-1";
pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5001";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 起動時に一度だけ読み込む設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// ストアへの接続 URI（DynamoDB エンドポイント）
    pub store_uri: String,
    /// データベース名（テーブル名）
    pub database_name: String,
    /// コレクション名（パーティション）
    pub collection_name: String,
    pub aws_region: String,
    pub environment: String,
    /// HTTP サーバーの待ち受けアドレス
    pub bind_addr: SocketAddr,
}

impl Config {
    /// `.env` を読み込んだ上でプロセス環境変数から設定を構築
    /// 既に設定済みの環境変数が `.env` より優先される
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), ".env を読み込みました");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー検索関数から設定を構築
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let store_uri = get(STORE_URI_KEY).ok_or(ConfigError::Missing(STORE_URI_KEY))?;
        let store_uri = validate_store_uri(store_uri.trim())?;

        let bind_addr = get(BIND_ADDR_KEY)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: BIND_ADDR_KEY,
                reason: e.to_string(),
            })?;

        Ok(Config {
            store_uri,
            database_name: get(DATABASE_NAME_KEY)
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            collection_name: get(COLLECTION_NAME_KEY)
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            aws_region: get(AWS_REGION_KEY).unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            environment: get(ENVIRONMENT_KEY).unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            bind_addr,
        })
    }
}

fn validate_store_uri(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: STORE_URI_KEY,
        reason: reason.to_string(),
    };

    let uri: Uri = raw.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    if uri.host().is_none() {
        return Err(invalid("host is missing"));
    }

    Ok(raw.to_string())
}
