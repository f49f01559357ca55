//! ログユーティリティ
//!
//! tracing の初期化と、実行ログファイルのヘッダ書き出し

use anyhow::Result;
use std::fs;
use tracing_subscriber::EnvFilter;

/// tracing サブスクライバを初期化する
///
/// RUST_LOG が未設定なら info レベルで出力する
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 実行ログファイルを初期化する
///
/// # 引数
/// - `log_file_path`: ログファイルのパス
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n過去問生成ログ - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}
