//! PDF テキスト抽出サービス - 業務能力層
//!
//! グリフの描画位置メタデータから読み順を再構成して平文を取り出す。
//! レイアウトエンジンは持たず、行ベースの読み順を近似する：
//! 縦位置の降順（ページ上部が先）、許容差内の同一行は横位置の昇順

use crate::error::{AppError, AppResult};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 同一行とみなす縦位置の許容差（ポジション単位）
const LINE_TOLERANCE: f32 = 5.0;

/// 抽出テキストがこの文字数未満なら「抽出不能（スキャン画像の可能性）」
pub const MIN_CONTENT_CHARS: usize = 50;

/// 1 つのテキストラン（位置付きグリフ列）
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// PDF テキスト抽出器
pub struct TextExtractor {
    min_content_chars: usize,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            min_content_chars: MIN_CONTENT_CHARS,
        }
    }

    /// 閾値を指定して生成（テスト・チューニング用）
    pub fn with_threshold(min_content_chars: usize) -> Self {
        Self { min_content_chars }
    }

    /// PDF バイト列からページごとの平文を取り出す
    ///
    /// テキストランが 1 つもないページ（スキャン画像の可能性）は
    /// 空文字列として残し、中断しない
    pub fn extract_pages(&self, bytes: &[u8]) -> AppResult<Vec<String>> {
        let doc = Document::load_mem(bytes)?;
        let mut pages = Vec::new();

        for (page_number, page_id) in doc.get_pages() {
            let runs = match collect_text_runs(&doc, page_id) {
                Ok(runs) => runs,
                Err(e) => {
                    warn!("ページ {} のコンテンツを解釈できません: {}", page_number, e);
                    pages.push(String::new());
                    continue;
                }
            };

            if runs.is_empty() {
                debug!(
                    "ページ {} にテキストランがありません（スキャン画像の可能性）",
                    page_number
                );
                pages.push(String::new());
                continue;
            }

            pages.push(assemble_page_text(runs));
        }

        Ok(pages)
    }

    /// PDF バイト列から全文テキストを取り出す（ページ間は改行で連結）
    pub fn extract_text(&self, bytes: &[u8]) -> AppResult<String> {
        Ok(self.extract_pages(bytes)?.join("\n"))
    }

    /// 最小文字数チェック付きの全文抽出
    ///
    /// 空白除去後の文字数が閾値未満なら UnextractableContent として返す。
    /// 呼び出し側はこのエラーで JSON フォールバックを判断する
    pub fn extract_text_checked(&self, bytes: &[u8], source_name: &str) -> AppResult<String> {
        let text = self.extract_text(bytes)?;
        let chars = text.trim().chars().count();
        if chars < self.min_content_chars {
            return Err(AppError::unextractable(source_name, chars));
        }
        Ok(text)
    }
}

/// 1 ページ分のテキストランを収集する
///
/// コンテンツストリームのテキストオペレータを解釈し、
/// テキスト行列の平行移動成分だけを位置として追跡する
fn collect_text_runs(doc: &Document, page_id: ObjectId) -> AppResult<Vec<TextRun>> {
    let fonts = doc.get_page_fonts(page_id);
    let encodings: BTreeMap<Vec<u8>, &str> = fonts
        .iter()
        .map(|(name, font)| (name.clone(), font.get_font_encoding()))
        .collect();

    let content_data = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_data)?;

    let mut runs: Vec<TextRun> = Vec::new();
    let mut current_encoding: Option<&str> = None;
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut leading = 0.0f32;

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                current_encoding = op
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand_f32(&op.operands, 0), operand_f32(&op.operands, 1)) {
                    x += tx;
                    y += ty;
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand_f32(&op.operands, 0), operand_f32(&op.operands, 1)) {
                    x += tx;
                    y += ty;
                    leading = -ty;
                }
            }
            "TL" => {
                if let Some(l) = operand_f32(&op.operands, 0) {
                    leading = l;
                }
            }
            "Tm" => {
                // 平行移動成分のみ追跡する
                if let (Some(e), Some(f)) = (operand_f32(&op.operands, 4), operand_f32(&op.operands, 5)) {
                    x = e;
                    y = f;
                }
            }
            "T*" => {
                y -= leading;
            }
            "Tj" => {
                push_run(&mut runs, x, y, current_encoding, op.operands.first());
            }
            "'" => {
                y -= leading;
                push_run(&mut runs, x, y, current_encoding, op.operands.first());
            }
            "\"" => {
                y -= leading;
                push_run(&mut runs, x, y, current_encoding, op.operands.get(2));
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = op.operands.first() {
                    let mut text = String::new();
                    for element in elements {
                        if let Object::String(bytes, _) = element {
                            text.push_str(&decode_run_text(current_encoding, bytes));
                        }
                    }
                    if !text.is_empty() {
                        runs.push(TextRun { x, y, text });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

fn push_run(runs: &mut Vec<TextRun>, x: f32, y: f32, encoding: Option<&str>, operand: Option<&Object>) {
    if let Some(Object::String(bytes, _)) = operand {
        let text = decode_run_text(encoding, bytes);
        if !text.is_empty() {
            runs.push(TextRun { x, y, text });
        }
    }
}

/// 文字列オペランドをデコードする
///
/// 和文 PDF には文字列が UTF-8 のまま埋め込まれているものがあるため、
/// 非 ASCII を含む正当な UTF-8 はフォントエンコーディングより優先する
fn decode_run_text(encoding: Option<&str>, bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        if s.chars().any(|c| !c.is_ascii()) {
            return s.to_string();
        }
    }
    Document::decode_text(encoding, bytes)
}

fn operand_f32(operands: &[Object], index: usize) -> Option<f32> {
    match operands.get(index) {
        Some(Object::Integer(i)) => Some(*i as f32),
        Some(Object::Real(r)) => Some(*r),
        _ => None,
    }
}

/// ラン列から 1 ページ分の平文を組み立てる
///
/// 第一ソートキーは縦位置の降順。許容差内のランは同一行として
/// 横位置の昇順に並べる
fn assemble_page_text(mut runs: Vec<TextRun>) -> String {
    runs.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= LINE_TOLERANCE => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            line.iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(x: f32, y: f32, text: &str) -> TextRun {
        TextRun {
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_assemble_orders_top_to_bottom() {
        let runs = vec![run(0.0, 100.0, "下の行"), run(0.0, 700.0, "上の行")];
        assert_eq!(assemble_page_text(runs), "上の行\n下の行");
    }

    #[test]
    fn test_assemble_orders_left_to_right_within_tolerance() {
        // 縦位置の差が許容差内なら同一行として左→右
        let runs = vec![
            run(300.0, 701.0, "右"),
            run(100.0, 699.0, "左"),
            run(200.0, 700.0, "中"),
        ];
        assert_eq!(assemble_page_text(runs), "左 中 右");
    }

    #[test]
    fn test_assemble_splits_lines_beyond_tolerance() {
        let runs = vec![run(0.0, 700.0, "1行目"), run(0.0, 690.0, "2行目")];
        assert_eq!(assemble_page_text(runs), "1行目\n2行目");
    }

    #[test]
    fn test_decode_run_text_prefers_embedded_utf8() {
        let bytes = "問1 次のうち".as_bytes();
        assert_eq!(decode_run_text(None, bytes), "問1 次のうち");
    }
}
