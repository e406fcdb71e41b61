//! todo CLI のエントリポイント

use anyhow::Context;
use infrastructure::TodoRepository;
use shared::{init_cli_tracing, Config};
use std::io::Write;
use todo_cli::{execute, parse_args, write_help, Invocation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_cli_tracing().map_err(|e| anyhow::anyhow!(e))?;

    let mut stdout = std::io::stdout();
    match parse_args(std::env::args()) {
        Invocation::Help => write_help(&mut stdout)?,
        Invocation::Invalid => {
            writeln!(stdout, "Invalid command or missing arguments.")?;
            write_help(&mut stdout)?;
        }
        Invocation::Exit => writeln!(stdout, "Exiting Todo application.")?,
        Invocation::Run(command) => {
            // ストアへの接続はデータコマンドのときだけ
            let config = Config::from_env().context("設定の読み込みに失敗しました")?;
            let repo = TodoRepository::connect(&config)
                .await
                .context("DynamoDB への接続に失敗しました")?;
            execute(command, &repo, &mut stdout).await?;
        }
    }

    stdout.flush()?;
    Ok(())
}
