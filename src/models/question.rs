use crate::models::category::Category;
use serde::{Deserialize, Serialize};

/// 選択肢ラベルの固定アルファベット
///
/// ラベルは認識順にこの並びで割り当てる
pub const CHOICE_LABELS: [&str; 5] = ["a", "b", "c", "d", "e"];

/// 解析に失敗した問題へ差し込むプレースホルダ本文
pub const PLACEHOLDER_QUESTION_TEXT: &str = "（この問題の本文を抽出できませんでした）";

/// 解析に失敗した選択肢へ差し込むプレースホルダ本文
pub const PLACEHOLDER_CHOICE_TEXT: &str = "（選択肢を抽出できませんでした）";

/// 試験セッション（午前・午後）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Morning,
    Afternoon,
}

impl Session {
    /// ファイル名などに使う短縮コード
    pub fn code(self) -> &'static str {
        match self {
            Session::Morning => "am",
            Session::Afternoon => "pm",
        }
    }

    /// 表示名
    pub fn label(self) -> &'static str {
        match self {
            Session::Morning => "午前",
            Session::Afternoon => "午後",
        }
    }

    /// 短縮コードから解析
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "am" => Some(Session::Morning),
            "pm" => Some(Session::Afternoon),
            _ => None,
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 問題レコードの出自
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOrigin {
    /// 構造化 JSON ソース由来
    Structured,
    /// PDF テキスト抽出由来
    PdfExtraction,
}

/// 選択肢
///
/// 親の Question が排他的に所有する（共有しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// ラベル（a〜e の小文字 1 字）
    pub label: String,
    /// 表示テキスト
    pub text: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// 別冊図版への参照
///
/// 同一問題内では画像番号で重複排除される
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementReference {
    /// 本文に現れた参照文字列（メタデータ推定の場合は合成ラベル）
    pub raw: String,
    /// 別冊内の画像番号
    pub image_number: u32,
    /// 画像の載っている別冊ページ番号（1 始まり）
    pub page: u32,
}

/// 正規化済みの問題レコード
///
/// 生成パス（ソース解決フロー）で一度だけ作られ、以後は不変。
/// シャッフルは必ず新しいコピーを返す（保存済みレコードを書き換えない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// グローバル一意 ID（回・セッション・問番号から導出）
    pub id: String,
    /// 試験回番号
    pub exam_number: u32,
    /// セッション
    pub session: Session,
    /// 問番号
    pub number: u32,
    /// 問題本文（空白正規化済み）
    pub text: String,
    /// 選択肢（認識順、ラベル一意、2〜5 個）
    pub choices: Vec<Choice>,
    /// 正答ラベル（複数正答時は correct_answers[0] と一致する）
    pub correct_answer: String,
    /// 複数正答のラベル一覧（採点時はこちらが優先される）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<String>>,
    /// 出題分野（None は未分類 = 分野フィルタ選択の対象外）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// 別冊参照
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplements: Vec<SupplementReference>,
    /// 出自フラグ
    pub origin: QuestionOrigin,
}

impl Question {
    /// 複合キーからグローバル一意 ID を導出する
    pub fn make_id(exam_number: u32, session: Session, number: u32) -> String {
        format!("{}_{}_q{}", exam_number, session.code(), number)
    }

    /// プレースホルダ問題かどうか
    pub fn is_placeholder(&self) -> bool {
        self.text == PLACEHOLDER_QUESTION_TEXT
    }

    /// 指定ラベルが正答かどうか（複数正答対応、大文字小文字は無視）
    pub fn is_correct_label(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        match &self.correct_answers {
            Some(answers) if answers.len() > 1 => {
                answers.iter().any(|a| a.to_lowercase() == label)
            }
            _ => self.correct_answer.to_lowercase() == label,
        }
    }

    /// 正答となる選択肢テキストの集合
    ///
    /// シャッフル前後で不変であることが保証される
    pub fn correct_choice_texts(&self) -> Vec<&str> {
        self.choices
            .iter()
            .filter(|c| self.is_correct_label(&c.label))
            .map(|c| c.text.as_str())
            .collect()
    }

    /// ラベルから選択肢を引く
    pub fn choice_by_label(&self, label: &str) -> Option<&Choice> {
        let label = label.to_lowercase();
        self.choices.iter().find(|c| c.label == label)
    }
}

/// 解答キーから得た 1 問分の正答レコード
///
/// 生成フローが即座に消費する中間データで、永続化しない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKeyEntry {
    pub exam_number: u32,
    pub session: Session,
    pub question_number: u32,
    /// 正答ラベル（小文字、出現順）。複数正答の場合は 2 つ以上
    pub answers: Vec<String>,
}

/// 1 問分の本文スパンと選択肢の解析結果
///
/// Question へ変換した時点で破棄される中間データ
#[derive(Debug, Clone)]
pub struct ParsedQuestionSection {
    pub number: u32,
    pub text: String,
    pub choices: Vec<Choice>,
    /// 解析失敗によりプレースホルダへ劣化したか
    pub is_placeholder: bool,
}

/// 別冊から抽出した画像レコード
///
/// 別冊ページのテキストから得た画像番号ラベルと、
/// 「（問N）」形式の逆参照メタデータを保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementImage {
    /// 別冊内の画像番号
    pub image_number: u32,
    /// 載っているページ番号（1 始まり）
    pub page: u32,
    /// ページ上のラベル文字列（例: "No.5"）
    pub label: String,
    /// この画像が対応する問番号（逆参照メタデータ）
    pub question_refs: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Question {
        Question {
            id: Question::make_id(30, Session::Morning, 1),
            exam_number: 30,
            session: Session::Morning,
            number: 1,
            text: "次のうち正しいものはどれか。".to_string(),
            choices: vec![
                Choice::new("a", "選択肢1"),
                Choice::new("b", "選択肢2"),
                Choice::new("c", "選択肢3"),
            ],
            correct_answer: "b".to_string(),
            correct_answers: None,
            category: None,
            supplements: Vec::new(),
            origin: QuestionOrigin::Structured,
        }
    }

    #[test]
    fn test_make_id() {
        assert_eq!(Question::make_id(30, Session::Morning, 12), "30_am_q12");
        assert_eq!(Question::make_id(31, Session::Afternoon, 3), "31_pm_q3");
    }

    #[test]
    fn test_is_correct_label_single() {
        let q = sample_question();
        assert!(q.is_correct_label("b"));
        assert!(q.is_correct_label("B"));
        assert!(!q.is_correct_label("a"));
    }

    #[test]
    fn test_is_correct_label_multi() {
        let mut q = sample_question();
        q.correct_answer = "a".to_string();
        q.correct_answers = Some(vec!["a".to_string(), "c".to_string()]);
        assert!(q.is_correct_label("a"));
        assert!(q.is_correct_label("c"));
        assert!(!q.is_correct_label("b"));
    }

    #[test]
    fn test_correct_choice_texts() {
        let q = sample_question();
        assert_eq!(q.correct_choice_texts(), vec!["選択肢2"]);
    }

    #[test]
    fn test_session_roundtrip() {
        assert_eq!(Session::from_code("am"), Some(Session::Morning));
        assert_eq!(Session::from_code("pm"), Some(Session::Afternoon));
        assert_eq!(Session::from_code("xx"), None);
        assert_eq!(Session::Morning.label(), "午前");
    }
}
