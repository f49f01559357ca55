use crate::models::question::Session;
use std::fmt;

/// アプリケーションエラー型
#[derive(Debug)]
pub enum AppError {
    /// ソース取得エラー
    Source(SourceError),
    /// PDF テキスト抽出エラー
    Extract(ExtractError),
    /// 解答キー解析エラー
    AnswerKey(AnswerKeyError),
    /// 問題文解析エラー（原則として問題単位で吸収され、セッションを落とさない）
    Parse(ParseError),
    /// 構造化ソース（JSON）エラー
    Structured(StructuredError),
    /// 設定エラー
    Config(ConfigError),
    /// その他（サードパーティエラーの包み込み用）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Source(e) => write!(f, "ソースエラー: {}", e),
            AppError::Extract(e) => write!(f, "抽出エラー: {}", e),
            AppError::AnswerKey(e) => write!(f, "解答キーエラー: {}", e),
            AppError::Parse(e) => write!(f, "解析エラー: {}", e),
            AppError::Structured(e) => write!(f, "構造化ソースエラー: {}", e),
            AppError::Config(e) => write!(f, "設定エラー: {}", e),
            AppError::Other(msg) => write!(f, "エラー: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Source(e) => Some(e),
            AppError::Extract(e) => Some(e),
            AppError::AnswerKey(e) => Some(e),
            AppError::Parse(e) => Some(e),
            AppError::Structured(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// ソース取得エラー
#[derive(Debug)]
pub enum SourceError {
    /// ファイルが見つからない
    NotFound {
        path: String,
    },
    /// 取得に失敗した（I/O・ネットワーク）
    FetchFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// HTTP がエラーステータスを返した
    HttpStatus {
        url: String,
        status: u16,
    },
    /// 利用可能なソースが尽きた（セッション致命）
    NoUsableSource {
        exam_number: u32,
        session: Session,
        structured_path: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::NotFound { path } => write!(f, "ファイルが見つかりません: {}", path),
            SourceError::FetchFailed { path, source } => {
                write!(f, "取得に失敗しました ({}): {}", path, source)
            }
            SourceError::HttpStatus { url, status } => {
                write!(f, "HTTP エラー ({}): ステータス {}", url, status)
            }
            SourceError::NoUsableSource {
                exam_number,
                session,
                structured_path,
            } => {
                write!(
                    f,
                    "第{}回 {} の問題を生成できるソースがありません。\n\
                     問題 PDF からテキストを抽出できない場合（スキャン画像など）は、\
                     構造化 JSON ファイルを手作業で用意してください。\n\
                     期待されるパス: {}\n\
                     期待される形式:\n{}",
                    exam_number,
                    session.label(),
                    structured_path,
                    STRUCTURED_SHAPE_HINT
                )
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::FetchFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 構造化 JSON の期待形状（セッション致命エラーの案内文に埋め込む）
pub const STRUCTURED_SHAPE_HINT: &str = r#"{
  "examNumber": 30,
  "year": 2024,
  "session": "morning",
  "totalQuestions": 60,
  "questions": [
    {
      "questionNumber": 1,
      "questionText": "...",
      "choices": { "a": "...", "b": "...", "c": "...", "d": "...", "e": "..." },
      "correctAnswer": "a",
      "correctAnswers": ["a", "c"],
      "category": "basic",
      "bessatsuPage": 3,
      "bessatsuLabel": "別冊No.5"
    }
  ]
}"#;

/// PDF テキスト抽出エラー
#[derive(Debug)]
pub enum ExtractError {
    /// PDF の読み込みに失敗した
    PdfLoadFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 抽出テキストが閾値未満（スキャン画像の可能性）
    Unextractable {
        name: String,
        chars: usize,
    },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::PdfLoadFailed { source } => {
                write!(f, "PDF の読み込みに失敗しました: {}", source)
            }
            ExtractError::Unextractable { name, chars } => {
                write!(
                    f,
                    "テキストを抽出できません ({}): 抽出文字数 {} が閾値未満です（スキャン画像の可能性）",
                    name, chars
                )
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::PdfLoadFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 解答キー解析エラー
#[derive(Debug)]
pub enum AnswerKeyError {
    /// 対象セッションの解答が 1 件も得られなかった（セッション致命）
    Empty {
        exam_number: u32,
        session: Session,
    },
}

impl fmt::Display for AnswerKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKeyError::Empty {
                exam_number,
                session,
            } => {
                write!(
                    f,
                    "第{}回 {} の解答が 1 件も解析できませんでした。解答なしでは採点できないため、このセッションの生成を中止します",
                    exam_number,
                    session.label()
                )
            }
        }
    }
}

impl std::error::Error for AnswerKeyError {}

/// 問題文解析エラー
///
/// 問題単位で発生し、プレースホルダへの劣化で吸収される。
/// セッション全体のエラーには昇格させない。
#[derive(Debug)]
pub enum ParseError {
    /// 問題番号に対応する本文スパンが見つからない
    SectionNotFound {
        question_number: u32,
    },
    /// スパンは見つかったが選択肢を 1 つも抽出できない
    ChoicesNotFound {
        question_number: u32,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::SectionNotFound { question_number } => {
                write!(f, "問{} の本文が見つかりません", question_number)
            }
            ParseError::ChoicesNotFound { question_number } => {
                write!(f, "問{} の選択肢を抽出できません", question_number)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// 構造化ソース（JSON）エラー
#[derive(Debug)]
pub enum StructuredError {
    /// JSON として不正、またはスキーマ不一致
    ///
    /// フォールバック判定上は「ソース欠如」と同じ扱いになる
    Malformed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredError::Malformed { path, source } => {
                write!(f, "構造化 JSON の解析に失敗しました ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for StructuredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StructuredError::Malformed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 設定エラー
#[derive(Debug)]
pub enum ConfigError {
    /// 環境変数の値を期待する型に変換できない
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "環境変数 {} の解析に失敗しました: 値 '{}' を {} に変換できません",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== よくあるエラー型からの変換 ==========
// anyhow は std::error::Error 実装型を自動で包めるため
// From<AppError> for anyhow::Error の手実装は不要

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Source(SourceError::FetchFailed {
            path: String::new(), // I/O エラー自体はパス情報を持たない
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Structured(StructuredError::Malformed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Extract(ExtractError::PdfLoadFailed {
            source: Box::new(err),
        })
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Other(format!("正規表現の構築に失敗しました: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let path = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Source(SourceError::FetchFailed {
            path,
            source: Box::new(err),
        })
    }
}

// ========== 便利コンストラクタ ==========

impl AppError {
    /// ソース不在エラーを生成
    pub fn source_not_found(path: impl Into<String>) -> Self {
        AppError::Source(SourceError::NotFound { path: path.into() })
    }

    /// ソース取得失敗エラーを生成
    pub fn fetch_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Source(SourceError::FetchFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 抽出不能エラーを生成
    pub fn unextractable(name: impl Into<String>, chars: usize) -> Self {
        AppError::Extract(ExtractError::Unextractable {
            name: name.into(),
            chars,
        })
    }

    /// 解答キー空エラーを生成
    pub fn answer_key_empty(exam_number: u32, session: Session) -> Self {
        AppError::AnswerKey(AnswerKeyError::Empty {
            exam_number,
            session,
        })
    }

    /// 構造化ソース不正エラーを生成
    pub fn malformed_structured(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Structured(StructuredError::Malformed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 全ソース枯渇エラー（案内文付き）を生成
    pub fn no_usable_source(
        exam_number: u32,
        session: Session,
        structured_path: impl Into<String>,
    ) -> Self {
        AppError::Source(SourceError::NoUsableSource {
            exam_number,
            session,
            structured_path: structured_path.into(),
        })
    }

    /// セッション致命エラーかどうか
    ///
    /// Parse 系は問題単位で吸収されるため致命ではない
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, AppError::Parse(_))
    }
}

// ========== Result 型エイリアス ==========

/// アプリケーション結果型
pub type AppResult<T> = Result<T, AppError>;
