use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::Client;
use domain::TodoError;
use shared::Config;
use tracing::{error, info};

/// DynamoDB への接続ハンドル
///
/// 起動時に一度だけ生成し、プロセス終了まで使い回す。
/// 再接続やリトライは行わない（SDK 側のリトライも無効化）。
#[derive(Debug, Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
    collection: String,
}

impl DynamoDbClient {
    /// 設定に従って接続し、テーブルの存在を確認する
    /// 失敗した場合は呼び出し元でプロセスを終了させる想定
    pub async fn connect(config: &Config) -> Result<Self, TodoError> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .endpoint_url(&config.store_uri)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let db = Self::from_client(
            Client::new(&aws_config),
            &config.database_name,
            &config.collection_name,
        );
        db.verify_table().await?;

        info!(
            endpoint = %config.store_uri,
            table = %db.table_name,
            collection = %db.collection,
            "DynamoDB に接続しました"
        );
        Ok(db)
    }

    /// 構築済みの SDK クライアントから生成（接続確認は行わない）
    pub fn from_client(client: Client, table_name: &str, collection: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            collection: collection.to_string(),
        }
    }

    async fn verify_table(&self) -> Result<(), TodoError> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| self.convert_error("DescribeTable", e))?;
        Ok(())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// SDK エラーをログに残して `TodoError::DynamoDb` へ変換
    pub fn convert_error<E, R>(&self, operation: &str, err: SdkError<E, R>) -> TodoError
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let detail = DisplayErrorContext(&err).to_string();
        error!(
            table = %self.table_name,
            operation,
            error = %detail,
            "DynamoDB 操作に失敗しました"
        );
        TodoError::DynamoDb(format!("{operation}: {detail}"))
    }
}
