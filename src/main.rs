use anyhow::Result;
use kakomon::utils::logging;
use kakomon::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // ログ初期化
    logging::init();

    // 設定読み込み
    let config = Config::from_env();

    // アプリケーション初期化と実行
    App::initialize(config).await?.run().await?;

    Ok(())
}
