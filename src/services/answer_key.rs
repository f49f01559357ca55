//! 解答キー解析サービス - 業務能力層
//!
//! 解答 PDF の平文から「問番号 → 正答ラベル列」を復元する。
//! レイアウトは年度によって揺れるため、固定オフセットではなく
//! パターンの逐次適用（特異度の高い順）で認識する

use crate::error::{AppError, AppResult};
use crate::models::question::{AnswerKeyEntry, Session};
use crate::utils::normalize_fullwidth;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// 解答キーパーサ
#[derive(Debug, Default)]
pub struct AnswerKeyParser;

/// 解析途中のトークン（出現位置つき）
#[derive(Debug)]
struct RawToken {
    position: usize,
    question_number: u32,
    answers: Vec<String>,
}

impl AnswerKeyParser {
    pub fn new() -> Self {
        Self
    }

    /// 両セッション分の解答エントリを解析する
    ///
    /// 1 件も認識できなければエラー（空リストを黙って返さない）
    pub fn parse(&self, text: &str, exam_number: u32) -> AppResult<Vec<AnswerKeyEntry>> {
        let mut entries = self.parse_inner(text, exam_number)?;
        if entries.is_empty() {
            return Err(AppError::answer_key_empty(exam_number, Session::Morning));
        }
        entries.sort_by_key(|e| (e.session != Session::Morning, e.question_number));
        Ok(entries)
    }

    /// 指定セッション分の解答エントリを解析する
    ///
    /// 対象セッションが 0 件ならセッション致命の AnswerKeyEmpty を返す
    pub fn parse_session(
        &self,
        text: &str,
        exam_number: u32,
        session: Session,
    ) -> AppResult<Vec<AnswerKeyEntry>> {
        let entries: Vec<AnswerKeyEntry> = self
            .parse_inner(text, exam_number)?
            .into_iter()
            .filter(|e| e.session == session)
            .collect();

        if entries.is_empty() {
            return Err(AppError::answer_key_empty(exam_number, session));
        }
        Ok(entries)
    }

    fn parse_inner(&self, text: &str, exam_number: u32) -> AppResult<Vec<AnswerKeyEntry>> {
        let text = normalize_fullwidth(text);
        let tokens = collect_tokens(&text)?;
        debug!("解答トークン {} 件を認識", tokens.len());

        let split_index = session_split_index(&text, &tokens);

        // 同一問番号が複数回現れた場合は後勝ち（訂正版の上書きとみなす）
        let mut morning: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        let mut afternoon: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (i, token) in tokens.into_iter().enumerate() {
            let target = if i < split_index {
                &mut morning
            } else {
                &mut afternoon
            };
            target.insert(token.question_number, token.answers);
        }

        let mut entries = Vec::new();
        for (session, map) in [(Session::Morning, morning), (Session::Afternoon, afternoon)] {
            for (question_number, answers) in map {
                entries.push(AnswerKeyEntry {
                    exam_number,
                    session,
                    question_number,
                    answers,
                });
            }
        }
        Ok(entries)
    }
}

/// 解答トークンを出現順に収集する
///
/// パターンは特異度の高い順に試し、最初に 1 件以上認識できた
/// パターンの結果を採用する：
/// 1. `問N a` / `問N b,d` 形式
/// 2. 行頭の `N a` 形式（表形式のキー）
fn collect_tokens(text: &str) -> AppResult<Vec<RawToken>> {
    let re_mon = Regex::new(r"問\s*(\d{1,3})\s*[:.)）]?\s*([a-eA-E](?:\s*[,、・/]\s*[a-eA-E])*)")?;
    let tokens = tokens_from(&re_mon, text);
    if !tokens.is_empty() {
        return Ok(tokens);
    }

    let re_bare =
        Regex::new(r"(?m)^\s*(\d{1,3})\s*[:.)）]?\s+([a-eA-E](?:\s*[,、・/]\s*[a-eA-E])*)\s*$")?;
    Ok(tokens_from(&re_bare, text))
}

fn tokens_from(re: &Regex, text: &str) -> Vec<RawToken> {
    re.captures_iter(text)
        .filter_map(|cap| {
            let position = cap.get(0).map(|m| m.start())?;
            let question_number: u32 = cap.get(1)?.as_str().parse().ok()?;
            let answers = split_letters(cap.get(2)?.as_str());
            if answers.is_empty() {
                return None;
            }
            Some(RawToken {
                position,
                question_number,
                answers,
            })
        })
        .collect()
}

/// 正答ラベル列を分解する（"b,d" → ["b", "d"]、入力順・小文字）
fn split_letters(s: &str) -> Vec<String> {
    s.chars()
        .filter(|c| matches!(c, 'a'..='e' | 'A'..='E'))
        .map(|c| c.to_ascii_lowercase().to_string())
        .collect()
}

/// 午前と午後の境目となるトークン位置を求める
///
/// 明示的なセクション見出し（午前・午後）があればそれを使い、
/// なければ問番号の折り返し（前より小さくなった箇所）で推定する。
/// 境目がなければ全件を午前として扱う（キーは午前を先に載せる前提）
fn session_split_index(text: &str, tokens: &[RawToken]) -> usize {
    let morning_pos = text.find("午前");
    let afternoon_pos = text.find("午後");

    let boundary = match (morning_pos, afternoon_pos) {
        (Some(m), Some(a)) if a > m => Some(a),
        (None, Some(a)) => Some(a),
        _ => None,
    };

    match boundary {
        Some(b) => tokens
            .iter()
            .position(|t| t.position >= b)
            .unwrap_or(tokens.len()),
        None => tokens
            .windows(2)
            .position(|w| w[1].question_number < w[0].question_number)
            .map(|i| i + 1)
            .unwrap_or(tokens.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_letters() {
        assert_eq!(split_letters("a"), vec!["a"]);
        assert_eq!(split_letters("b,d"), vec!["b", "d"]);
        assert_eq!(split_letters("B・D"), vec!["b", "d"]);
    }

    #[test]
    fn test_reset_heuristic_splits_sessions() {
        let parser = AnswerKeyParser::new();
        let text = "問1 a\n問2 b\n問1 c\n問2 d\n";
        let entries = parser.parse(text, 30).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].session, Session::Morning);
        assert_eq!(entries[2].session, Session::Afternoon);
        assert_eq!(entries[2].answers, vec!["c"]);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let parser = AnswerKeyParser::new();
        // 問1 の再掲は訂正とみなして上書き
        let text = "午前\n問1 a\n問1 b\n問2 c\n";
        let entries = parser
            .parse_session(text, 30, Session::Morning)
            .unwrap();
        assert_eq!(entries[0].answers, vec!["b"]);
    }
}
