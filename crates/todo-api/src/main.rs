//! todo-api バイナリのエントリポイント

use anyhow::Context;
use shared::{init_tracing, Config};
use infrastructure::TodoRepository;
use todo_api::app;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("設定の読み込みに失敗しました")?;
    init_tracing().map_err(|e| anyhow::anyhow!(e))?;

    // ストアに届かない場合はここで終了する
    let repo = TodoRepository::connect(&config)
        .await
        .context("DynamoDB への接続に失敗しました")?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, environment = %config.environment, "server starting");

    axum::serve(listener, app(repo))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "シグナルハンドラの登録に失敗しました");
        std::future::pending::<()>().await;
    }
}
