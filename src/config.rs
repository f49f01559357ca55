use crate::error::{AppError, AppResult, ConfigError};
use crate::models::question::Session;

/// アプリケーション設定
#[derive(Clone, Debug)]
pub struct Config {
    /// 同時に実行する (回, セッション) 生成タスク数
    pub max_concurrent_sessions: usize,
    /// ソース置き場（ローカルディレクトリ、または http(s) ベース URL）
    pub source_base: String,
    /// 生成結果の出力ディレクトリ
    pub output_dir: String,
    /// 処理対象の回番号（カンマ区切り、例: "30,31"）
    pub exam_numbers: String,
    /// 分野範囲テーブル（TOML）のパス。未指定なら組み込み既定を使う
    pub category_table_path: Option<String>,
    /// 抽出テキストの最小文字数（未満はスキャン画像とみなす）
    pub min_content_chars: usize,
    /// 実行ログファイル
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 4,
            source_base: "sources".to_string(),
            output_dir: "generated".to_string(),
            exam_numbers: "30".to_string(),
            category_table_path: None,
            min_content_chars: 50,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_sessions: std::env::var("MAX_CONCURRENT_SESSIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_sessions),
            source_base: std::env::var("SOURCE_BASE").unwrap_or(default.source_base),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            exam_numbers: std::env::var("EXAM_NUMBERS").unwrap_or(default.exam_numbers),
            category_table_path: std::env::var("CATEGORY_TABLE_PATH").ok(),
            min_content_chars: std::env::var("MIN_CONTENT_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_content_chars),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 処理対象の (回, セッション) 一覧を展開する
    ///
    /// 各回につき午前・午後の両セッションを生成する
    pub fn exam_targets(&self) -> AppResult<Vec<(u32, Session)>> {
        let mut targets = Vec::new();
        for raw in self.exam_numbers.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let exam_number: u32 = raw.parse().map_err(|_| {
                AppError::Config(ConfigError::EnvVarParseFailed {
                    var_name: "EXAM_NUMBERS".to_string(),
                    value: raw.to_string(),
                    expected_type: "u32".to_string(),
                })
            })?;
            targets.push((exam_number, Session::Morning));
            targets.push((exam_number, Session::Afternoon));
        }
        Ok(targets)
    }
}
