//! 一括生成オーケストレータ - 編成層
//!
//! ## 職責
//!
//! 本モジュールはアプリケーションの入口で、複数 (回, セッション) の
//! 生成タスクを編成する。
//!
//! 1. **初期化**: ログファイル・分野テーブル・生成フローの準備
//! 2. **並行制御**: Semaphore で同時実行数を制限
//! 3. **独立実行**: タスクは互いに独立。1 つの致命エラーが他の回・
//!    セッションへ波及しない
//! 4. **集計**: 成功・失敗・プレースホルダ数を集計し、どのセッションが
//!    失敗したかを成功分を失わずに報告する
//! 5. **出力**: 成功したセッションの Question 列を JSON で書き出す
//! 6. **共有資源**: レンダリング画像キャッシュを全タスクで共有保持する

use crate::config::Config;
use crate::infrastructure::ImageCache;
use crate::models::loaders::load_category_table_or_builtin;
use crate::models::question::Session;
use crate::utils::logging::init_log_file;
use crate::workflow::{GenerationFlow, SessionCtx};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// アプリケーション本体
pub struct App {
    config: Config,
    flow: Arc<GenerationFlow>,
    image_cache: Arc<ImageCache>,
}

/// 全体統計
#[derive(Debug, Default)]
pub struct GenerationStats {
    pub success: usize,
    pub failed: usize,
    /// 成功セッションに含まれるプレースホルダ問の総数
    pub placeholders: usize,
    pub total: usize,
    /// 失敗したセッションと理由
    pub failed_sessions: Vec<String>,
}

/// 1 タスクの集計値（問数, プレースホルダ数）
type TaskOutcome = (usize, usize);

impl App {
    /// アプリケーションを初期化する
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let category_table = load_category_table_or_builtin(config.category_table_path.as_deref())
            .await
            .context("分野テーブルの初期化に失敗しました")?;

        let flow = Arc::new(GenerationFlow::new(&config, category_table));

        Ok(Self {
            config,
            flow,
            image_cache: Arc::new(ImageCache::new()),
        })
    }

    /// レンダリング協力層へ渡す共有画像キャッシュ
    pub fn image_cache(&self) -> Arc<ImageCache> {
        self.image_cache.clone()
    }

    /// アプリケーション主処理
    pub async fn run(&self) -> Result<()> {
        let targets = self.config.exam_targets()?;
        if targets.is_empty() {
            warn!("⚠️ 処理対象の回が指定されていません。終了します");
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| format!("出力先を作成できません: {}", self.config.output_dir))?;

        log_targets(targets.len(), self.config.max_concurrent_sessions);

        let stats = self.generate_all(targets).await?;

        print_final_stats(&stats, &self.config);
        Ok(())
    }

    /// 全ターゲットを並行生成する
    pub async fn generate_all(&self, targets: Vec<(u32, Session)>) -> Result<GenerationStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sessions));
        let mut stats = GenerationStats {
            total: targets.len(),
            ..Default::default()
        };

        let mut handles = Vec::with_capacity(targets.len());
        for (index, (exam_number, session)) in targets.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            let ctx = SessionCtx::new(exam_number, session, index + 1);
            let flow = self.flow.clone();
            let output_dir = self.config.output_dir.clone();

            let label = ctx.to_string();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                run_session_task(flow, ctx, output_dir).await
            });
            handles.push((label, handle));
        }

        for (label, handle) in handles {
            match handle.await {
                Ok(Ok((count, placeholders))) => {
                    stats.success += 1;
                    stats.placeholders += placeholders;
                    info!("✓ {} : {} 問 (劣化 {})", label, count, placeholders);
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    stats.failed_sessions.push(format!("{}: {}", label, e));
                }
                Err(e) => {
                    error!("{} のタスク実行に失敗: {}", label, e);
                    stats.failed += 1;
                    stats.failed_sessions.push(format!("{}: {}", label, e));
                }
            }
        }

        Ok(stats)
    }
}

/// 1 セッション分のタスク本体
///
/// 成功時は Question 列を出力ディレクトリへ書き出す。
/// Question はタスク完走時にのみ公開されるため、途中放棄しても
/// 後始末すべき部分状態は残らない
async fn run_session_task(
    flow: Arc<GenerationFlow>,
    ctx: SessionCtx,
    output_dir: String,
) -> Result<TaskOutcome> {
    let report = match flow.run(&ctx).await {
        Ok(report) => report,
        Err(e) => {
            error!("[{}] ❌ 生成に失敗しました: {}", ctx, e);
            return Err(e.into());
        }
    };

    let out_path = format!(
        "{}/{}_{}_questions.json",
        output_dir,
        ctx.exam_number,
        ctx.session.code()
    );
    let json = serde_json::to_vec_pretty(&report.questions)?;
    tokio::fs::write(&out_path, json)
        .await
        .with_context(|| format!("出力を書き込めません: {}", out_path))?;
    info!("[{}] 💾 書き出し: {}", ctx, out_path);

    Ok((report.questions.len(), report.placeholder_count))
}

// ========== ログ補助関数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 過去問生成パイプライン起動");
    info!("📁 ソース: {}", config.source_base);
    info!("📊 最大並行数: {}", config.max_concurrent_sessions);
    info!("{}", "=".repeat(60));
}

fn log_targets(total: usize, max_concurrent: usize) {
    info!("✓ 生成対象 {} セッション", total);
    info!("💡 最大 {} タスクずつ並行処理します\n", max_concurrent);
}

fn print_final_stats(stats: &GenerationStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全セッション処理完了");
    info!(
        "完了時刻: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失敗: {}", stats.failed);
    if stats.placeholders > 0 {
        info!("⚠️ プレースホルダ問: {}", stats.placeholders);
    }
    for failed in &stats.failed_sessions {
        warn!("  - {}", failed);
    }
    info!("{}", "=".repeat(60));
    info!("\nログは {} に保存されています", config.output_log_file);
}
