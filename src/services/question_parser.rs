//! 問題文解析サービス - 業務能力層
//!
//! 問題 PDF の平文から、指定問番号の本文スパンと選択肢を復元する。
//!
//! ## 認識方針
//!
//! - スパン特定も選択肢抽出も「特異度の高い順にパターンを試し、
//!   最初に成立したものを採用」する逐次戦略
//! - 全角数字は正規化済みの前提でパターンは半角のみ（二重化しない）
//! - 解析に失敗してもエラーにせず、プレースホルダへ劣化させる。
//!   1 問の失敗でセッション全体を落とさないための意図的な設計

use crate::error::{AppResult, ParseError};
use crate::models::question::{
    Choice, ParsedQuestionSection, CHOICE_LABELS, PLACEHOLDER_CHOICE_TEXT,
    PLACEHOLDER_QUESTION_TEXT,
};
use crate::utils::{collapse_whitespace, normalize_fullwidth};
use regex::Regex;
use tracing::{debug, warn};

/// スパンとして採用する最小文字数
///
/// 無関係な本文中の数字への誤マッチを弾く
const MIN_SPAN_CHARS: usize = 20;

/// スパン特定戦略（特異度の高い順に試す純関数の列）
type LocateFn = fn(&str, u32) -> AppResult<Option<String>>;

const LOCATORS: [LocateFn; 3] = [locate_line_marker, locate_inline_marker, locate_bare_number];

/// 選択肢抽出戦略（最初のマーカー位置と選択肢テキスト列を返す）
type ChoicesFn = fn(&str) -> AppResult<Option<(usize, Vec<String>)>>;

const CHOICE_STRATEGIES: [ChoicesFn; 3] =
    [choices_labeled_lines, choices_numeral_lines, choices_loose_inline];

/// 問題文パーサ
pub struct QuestionParser {
    min_span_chars: usize,
}

impl Default for QuestionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionParser {
    pub fn new() -> Self {
        Self {
            min_span_chars: MIN_SPAN_CHARS,
        }
    }

    /// 問番号に対応する本文スパンを特定する
    ///
    /// 見つからなければ None（エラーにしない）
    pub fn locate_section(&self, text: &str, number: u32) -> AppResult<Option<String>> {
        let normalized = normalize_fullwidth(text);
        for locate in LOCATORS {
            if let Some(span) = locate(&normalized, number)? {
                if span.trim().chars().count() >= self.min_span_chars {
                    return Ok(Some(span));
                }
            }
        }
        Ok(None)
    }

    /// 1 問分を解析する
    ///
    /// スパン不在・選択肢ゼロの場合はプレースホルダへ劣化させて返す。
    /// この関数自体は決して失敗しない
    pub fn parse_section(&self, text: &str, number: u32) -> ParsedQuestionSection {
        match self.try_parse_section(text, number) {
            Ok(section) => section,
            Err(e) => {
                warn!("問{} の解析で内部エラー: {}", number, e);
                placeholder_section(number)
            }
        }
    }

    /// プレースホルダ問題を合成する
    ///
    /// 解答キー上のどのラベルでも照合できるよう、選択肢は a〜e の 5 個を持つ
    pub fn placeholder(&self, number: u32) -> ParsedQuestionSection {
        placeholder_section(number)
    }

    fn try_parse_section(&self, text: &str, number: u32) -> AppResult<ParsedQuestionSection> {
        let span = match self.locate_section(text, number)? {
            Some(span) => span,
            None => {
                debug!("{}", ParseError::SectionNotFound { question_number: number });
                return Ok(placeholder_section(number));
            }
        };

        let (body, choices) = extract_choices(&span)?;

        // 空選択肢を捨てた結果 2 個未満なら成立しない
        if choices.len() < 2 {
            debug!("{}", ParseError::ChoicesNotFound { question_number: number });
            return Ok(placeholder_section(number));
        }

        Ok(ParsedQuestionSection {
            number,
            text: body,
            choices,
            is_placeholder: false,
        })
    }
}

fn placeholder_section(number: u32) -> ParsedQuestionSection {
    ParsedQuestionSection {
        number,
        text: PLACEHOLDER_QUESTION_TEXT.to_string(),
        choices: CHOICE_LABELS
            .iter()
            .map(|label| Choice::new(*label, PLACEHOLDER_CHOICE_TEXT))
            .collect(),
        is_placeholder: true,
    }
}

// ========== スパン特定戦略 ==========

/// 戦略 1: 行頭の「問N」マーカー
fn locate_line_marker(text: &str, number: u32) -> AppResult<Option<String>> {
    let start = Regex::new(&format!(
        r"(?m)^[ \t]*問\s*{}\s*(?:[.)、。:）\s]|$)",
        number
    ))?;
    let next = Regex::new(r"(?m)^[ \t]*問\s*\d{1,3}\s*(?:[.)、。:）\s]|$)")?;
    Ok(span_between(text, &start, &next))
}

/// 戦略 2: 文中の「問N」マーカー（区切り記号必須）
fn locate_inline_marker(text: &str, number: u32) -> AppResult<Option<String>> {
    let start = Regex::new(&format!(r"問\s*{}[.)、。:）]", number))?;
    let next = Regex::new(r"問\s*\d{1,3}[.)、。:）]")?;
    Ok(span_between(text, &start, &next))
}

/// 戦略 3: 行頭の裸の番号（最後の手段）
fn locate_bare_number(text: &str, number: u32) -> AppResult<Option<String>> {
    let start = Regex::new(&format!(r"(?m)^[ \t]*{}\s*[.)、）]\s+", number))?;
    let next = Regex::new(r"(?m)^[ \t]*\d{1,3}\s*[.)、）]\s+")?;
    Ok(span_between(text, &start, &next))
}

/// 自マーカーから、次の問マーカー（同等以上の特異度）または文書末までを切り出す
fn span_between(text: &str, start_re: &Regex, next_re: &Regex) -> Option<String> {
    let m = start_re.find(text)?;
    let rest = &text[m.end()..];
    let end = next_re
        .find(rest)
        .map(|n| m.end() + n.start())
        .unwrap_or(text.len());
    Some(text[m.start()..end].to_string())
}

// ========== 選択肢抽出戦略 ==========

/// スパンから本文と選択肢を取り出す
///
/// 戦略を順に試し、最初に選択肢を 1 つ以上返したものを採用する。
/// 選択肢ラベルは認識順に a〜e を貼り直し、最大 5 個で打ち切る
fn extract_choices(span: &str) -> AppResult<(String, Vec<Choice>)> {
    let span = strip_leading_marker(span)?;

    for strategy in CHOICE_STRATEGIES {
        if let Some((first_pos, texts)) = strategy(&span)? {
            let texts: Vec<String> = texts
                .into_iter()
                .map(|t| collapse_whitespace(&t))
                .filter(|t| !t.is_empty())
                .take(CHOICE_LABELS.len())
                .collect();
            if !texts.is_empty() {
                let body = collapse_whitespace(&span[..first_pos]);
                let choices = texts
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| Choice::new(CHOICE_LABELS[i], t))
                    .collect();
                return Ok((body, choices));
            }
        }
    }

    Ok((collapse_whitespace(&span), Vec::new()))
}

/// スパン先頭の問マーカー自体を取り除く
///
/// 裸番号マーカーを数字選択肢と取り違えないために必要
fn strip_leading_marker(span: &str) -> AppResult<String> {
    let re = Regex::new(r"^[ \t]*(?:問\s*\d{1,3}|\d{1,3})\s*[.)、。:）]?\s*")?;
    Ok(re.replace(span, "").into_owned())
}

/// 戦略 (a): 行頭の `a.` 形式のラベル付きリスト
fn choices_labeled_lines(span: &str) -> AppResult<Option<(usize, Vec<String>)>> {
    let re = Regex::new(r"(?m)^[ \t]*[a-eA-E]\s*[.)）:]\s*")?;
    Ok(texts_between_markers(span, &re))
}

/// 戦略 (b): 数字・丸数字リスト（位置で a〜e に対応付ける）
fn choices_numeral_lines(span: &str) -> AppResult<Option<(usize, Vec<String>)>> {
    let re = Regex::new(r"(?m)^[ \t]*(?:[1-5]\s*[.)）:]|[①②③④⑤])\s*")?;
    Ok(texts_between_markers(span, &re))
}

/// 戦略 (c): 文中のゆるい `a.` 形式（最後の手段）
fn choices_loose_inline(span: &str) -> AppResult<Option<(usize, Vec<String>)>> {
    let re = Regex::new(r"[a-eA-E][.)）]\s*")?;
    Ok(texts_between_markers(span, &re))
}

/// マーカー位置で区切り、マーカー間のテキストを選択肢として集める
fn texts_between_markers(span: &str, re: &Regex) -> Option<(usize, Vec<String>)> {
    let markers: Vec<(usize, usize)> = re.find_iter(span).map(|m| (m.start(), m.end())).collect();
    if markers.is_empty() {
        return None;
    }

    let mut texts = Vec::with_capacity(markers.len());
    for (i, (_, end)) in markers.iter().enumerate() {
        let until = markers
            .get(i + 1)
            .map(|(next_start, _)| *next_start)
            .unwrap_or(span.len());
        texts.push(span[*end..until].to_string());
    }
    Some((markers[0].0, texts))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "問1 細胞小器官について正しいものはどれか。\n\
        a. ミトコンドリアは ATP を合成する\n\
        b. リボソームは脂質を分解する\n\
        c. 核は細胞膜の外にある\n\
        d. ゴルジ体は DNA を複製する\n\
        問2 血液について誤っているものはどれか。\n\
        a. 赤血球は酸素を運ぶ\n\
        b. 白血球は免疫を担う\n";

    #[test]
    fn test_locate_section_stops_at_next_marker() {
        let parser = QuestionParser::new();
        let span = parser.locate_section(SAMPLE, 1).unwrap().unwrap();
        assert!(span.contains("細胞小器官"));
        assert!(!span.contains("血液"));
    }

    #[test]
    fn test_locate_section_fullwidth_number() {
        let parser = QuestionParser::new();
        let text = "問１ 全角番号の問題文をここに十分な長さで書いておく。\na. 選択肢あ\nb. 選択肢い\n";
        let span = parser.locate_section(text, 1).unwrap();
        assert!(span.is_some());
    }

    #[test]
    fn test_parse_section_labeled_choices() {
        let parser = QuestionParser::new();
        let section = parser.parse_section(SAMPLE, 1);
        assert!(!section.is_placeholder);
        assert_eq!(section.choices.len(), 4);
        assert_eq!(section.choices[0].label, "a");
        assert_eq!(section.choices[0].text, "ミトコンドリアは ATP を合成する");
        assert!(section.text.contains("細胞小器官"));
    }

    #[test]
    fn test_parse_section_numeral_choices() {
        let parser = QuestionParser::new();
        let text = "問3 数字リスト形式の選択肢を持つ問題文はこちら。\n\
            1. 一つ目\n2. 二つ目\n3. 三つ目\n";
        let section = parser.parse_section(text, 3);
        assert!(!section.is_placeholder);
        assert_eq!(section.choices.len(), 3);
        // 数字は位置で a〜e に対応付ける
        assert_eq!(section.choices[0], Choice::new("a", "一つ目"));
        assert_eq!(section.choices[2], Choice::new("c", "三つ目"));
    }

    #[test]
    fn test_parse_section_circled_numeral_choices() {
        let parser = QuestionParser::new();
        let text = "問4 丸数字リスト形式の選択肢を持つ問題文はこちら。\n\
            ① まるいち\n② まるに\n";
        let section = parser.parse_section(text, 4);
        assert!(!section.is_placeholder);
        assert_eq!(section.choices[1], Choice::new("b", "まるに"));
    }

    #[test]
    fn test_parse_section_missing_returns_placeholder() {
        let parser = QuestionParser::new();
        let section = parser.parse_section(SAMPLE, 99);
        assert!(section.is_placeholder);
        assert_eq!(section.text, PLACEHOLDER_QUESTION_TEXT);
        assert_eq!(section.choices.len(), CHOICE_LABELS.len());
    }

    #[test]
    fn test_short_span_is_rejected() {
        let parser = QuestionParser::new();
        // 短すぎるスパンは本文中の数字への誤マッチとみなす
        let section = parser.parse_section("問5 短い。", 5);
        assert!(section.is_placeholder);
    }
}
