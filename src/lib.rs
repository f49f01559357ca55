//! # kakomon
//!
//! 国家試験の過去問 PDF から構造化された問題データを復元する
//! 抽出・正規化パイプライン
//!
//! ## アーキテクチャ
//!
//! 本システムは 4 層構成を採る：
//!
//! ### ① 基盤層（Infrastructure）
//! - `infrastructure/` - 外部 I/O と共有資源だけを持つ
//! - `SourceFetcher` - PDF / JSON バイト列の取得（ローカル・リモート）
//! - `ImageCache` - レンダリング済み画像の共有キャッシュ
//!
//! ### ② 業務能力層（Services）
//! - `services/` - 「何ができるか」を記述し、単一の対象だけを扱う
//! - `TextExtractor` - グリフ位置から読み順を再構成するテキスト抽出
//! - `AnswerKeyParser` - 解答キーの復元（複数正答対応）
//! - `QuestionParser` - 問題スパン特定と選択肢抽出（多段戦略）
//! - `SupplementLinker` - 別冊参照のリンク（テキスト＋メタデータ）
//! - `shuffle` - 選択肢シャッフルと正答ラベルの貼り替え
//!
//! ### ③ 流れ層（Workflow）
//! - `workflow/` - 1 つの (回, セッション) の完全な生成手順を定義
//! - `SessionCtx` - コンテキスト封じ込め（回番号 + セッション）
//! - `GenerationFlow` - 状態遷移（構造化 JSON → PDF 抽出 → 劣化）
//!
//! ### ④ 編成層（Orchestration）
//! - `orchestrator/batch_generator` - 複数セッションの並行実行と集計
//!
//! ## モジュール構成

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// よく使う型の再エクスポート
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ImageCache, ImageKey, SourceFetcher};
pub use models::question::{Choice, Question, QuestionOrigin, Session, SupplementReference};
pub use orchestrator::{App, GenerationStats};
pub use services::shuffle::{apply_permutation, shuffle_choices};
pub use workflow::{GenerationFlow, GenerationReport, SessionCtx};
