//! 構造化 JSON ソースの読み取り契約
//!
//! (回, セッション) ごとに 1 ファイル。存在すれば PDF 抽出より優先される
//! 正本ソースで、フィールド名は camelCase

use crate::models::category::{Category, CategoryTable};
use crate::models::question::{
    Choice, Question, QuestionOrigin, Session, SupplementReference, CHOICE_LABELS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// 構造化ソースのルート
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredExam {
    pub exam_number: u32,
    pub year: u32,
    pub session: Session,
    pub total_questions: u32,
    pub questions: Vec<StructuredQuestion>,
}

/// 構造化ソースの 1 問
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuestion {
    pub question_number: u32,
    pub question_text: String,
    pub choices: StructuredChoices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bessatsu_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bessatsu_label: Option<String>,
}

/// 選択肢マップ（a〜e）
///
/// e の欠落、または空文字の選択肢は「存在しない」として落とす
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredChoices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl StructuredChoices {
    /// 空でない選択肢を a〜e の順に取り出す
    ///
    /// ラベルは認識順に貼り直す（元のキーが飛んでいても a から詰める）
    fn to_choices(&self) -> Vec<Choice> {
        [&self.a, &self.b, &self.c, &self.d, &self.e]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(i, t)| Choice::new(CHOICE_LABELS[i], t))
            .collect()
    }
}

impl StructuredExam {
    /// 構造化レコードを正規化済み Question 列に変換する
    ///
    /// # 引数
    /// - `table`: 分野範囲テーブル（埋め込み分野がない場合に使う）
    /// - `answer_map`: 問番号 → 正答ラベル列。レコード自身が正答を
    ///   持たない場合に限って参照する
    ///
    /// 不正な問（選択肢 2 個未満、正答なし、正答ラベル不一致）は
    /// 警告を出して読み飛ばす。全問不正なら空列が返り、呼び出し側で
    /// 「ソース欠如」と同じ扱いになる
    pub fn into_questions(
        self,
        table: &CategoryTable,
        answer_map: &HashMap<u32, Vec<String>>,
    ) -> Vec<Question> {
        let exam_number = self.exam_number;
        let session = self.session;

        self.questions
            .into_iter()
            .filter_map(|sq| convert_question(sq, exam_number, session, table, answer_map))
            .collect()
    }
}

/// 1 問分の変換
fn convert_question(
    sq: StructuredQuestion,
    exam_number: u32,
    session: Session,
    table: &CategoryTable,
    answer_map: &HashMap<u32, Vec<String>>,
) -> Option<Question> {
    let number = sq.question_number;
    let choices = sq.choices.to_choices();

    if choices.len() < 2 {
        warn!(
            "問{}: 選択肢が {} 個しかないため読み飛ばします",
            number,
            choices.len()
        );
        return None;
    }

    let (correct_answer, correct_answers) =
        resolve_answers(&sq, number, &choices, answer_map)?;

    let category = sq
        .category
        .unwrap_or_else(|| table.classify(session, number));

    let supplements = supplement_from_metadata(&sq);

    Some(Question {
        id: Question::make_id(exam_number, session, number),
        exam_number,
        session,
        number,
        text: sq.question_text.trim().to_string(),
        choices,
        correct_answer,
        correct_answers,
        category: Some(category),
        supplements,
        origin: QuestionOrigin::Structured,
    })
}

/// 正答の決定
///
/// 優先順: correctAnswers → correctAnswer → 別途ロード済み解答マップ。
/// correctAnswers がある場合、先頭要素が常に表示上の正答になる
fn resolve_answers(
    sq: &StructuredQuestion,
    number: u32,
    choices: &[Choice],
    answer_map: &HashMap<u32, Vec<String>>,
) -> Option<(String, Option<Vec<String>>)> {
    let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();

    let validate = |label: &str| -> Option<String> {
        let lower = label.trim().to_lowercase();
        if labels.contains(&lower.as_str()) {
            Some(lower)
        } else {
            warn!("問{}: 正答ラベル '{}' が選択肢に存在しません", number, label);
            None
        }
    };

    if let Some(multi) = sq.correct_answers.as_ref().filter(|v| !v.is_empty()) {
        let mut lowered = Vec::with_capacity(multi.len());
        for label in multi {
            lowered.push(validate(label)?);
        }
        let primary = lowered[0].clone();
        let multi = if lowered.len() > 1 {
            Some(lowered)
        } else {
            None
        };
        return Some((primary, multi));
    }

    if let Some(single) = sq.correct_answer.as_deref() {
        return Some((validate(single)?, None));
    }

    if let Some(answers) = answer_map.get(&number).filter(|v| !v.is_empty()) {
        let mut lowered = Vec::with_capacity(answers.len());
        for label in answers {
            lowered.push(validate(label)?);
        }
        let primary = lowered[0].clone();
        let multi = if lowered.len() > 1 {
            Some(lowered)
        } else {
            None
        };
        return Some((primary, multi));
    }

    warn!("問{}: 正答がどのソースにもないため読み飛ばします", number);
    None
}

/// bessatsu メタデータから別冊参照を組み立てる
fn supplement_from_metadata(sq: &StructuredQuestion) -> Vec<SupplementReference> {
    let label_number = sq
        .bessatsu_label
        .as_deref()
        .and_then(|l| extract_trailing_number(l));

    match (sq.bessatsu_page, label_number) {
        (Some(page), Some(n)) => vec![SupplementReference {
            raw: sq.bessatsu_label.clone().unwrap_or_default(),
            image_number: n,
            page,
        }],
        (Some(page), None) => vec![SupplementReference {
            raw: sq
                .bessatsu_label
                .clone()
                .unwrap_or_else(|| format!("別冊 p.{}", page)),
            image_number: page,
            page,
        }],
        (None, Some(n)) => vec![SupplementReference {
            raw: sq.bessatsu_label.clone().unwrap_or_default(),
            image_number: n,
            page: n,
        }],
        (None, None) => Vec::new(),
    }
}

/// ラベル文字列末尾の数値を取り出す（例: "別冊No.5" → 5）
fn extract_trailing_number(label: &str) -> Option<u32> {
    let normalized = crate::utils::normalize_fullwidth(label);
    let digits: String = normalized
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_missing_choices_are_dropped() {
        let choices = StructuredChoices {
            a: Some("X".to_string()),
            b: Some("  ".to_string()),
            c: Some("Z".to_string()),
            d: None,
            e: None,
        };
        let converted = choices.to_choices();
        assert_eq!(converted.len(), 2);
        // ラベルは詰め直す
        assert_eq!(converted[0], Choice::new("a", "X"));
        assert_eq!(converted[1], Choice::new("b", "Z"));
    }

    #[test]
    fn test_extract_trailing_number() {
        assert_eq!(extract_trailing_number("別冊No.5"), Some(5));
        assert_eq!(extract_trailing_number("別冊Ｎｏ．１２"), Some(12));
        assert_eq!(extract_trailing_number("別冊"), None);
    }
}
