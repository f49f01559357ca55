//! 別冊参照リンクサービス - 業務能力層
//!
//! 問題本文中の別冊参照（テキスト駆動）と、別冊側の
//! 「（問N）」逆参照メタデータ（メタデータ駆動）の両方を適用し、
//! 画像番号で重複排除した参照リストを組み立てる。
//! 紙面レイアウト上でしか参照が読み取れない問題はメタデータ駆動で拾う

use crate::error::AppResult;
use crate::models::question::{SupplementImage, SupplementReference};
use crate::utils::normalize_fullwidth;
use regex::Regex;
use tracing::debug;

/// 別冊参照リンカ
#[derive(Debug, Default)]
pub struct SupplementLinker;

impl SupplementLinker {
    pub fn new() -> Self {
        Self
    }

    /// 別冊ページのテキストから画像レコードを組み立てる
    ///
    /// ページ上の画像番号ラベル（No.5 / 図5 / 写真5）を区切りとし、
    /// 各区切り内に現れる「（問N）」をその画像の逆参照として拾う
    pub fn parse_supplement_pages(&self, pages: &[String]) -> AppResult<Vec<SupplementImage>> {
        let re_label = Regex::new(r"(?:No\.?\s*|図\s*|写真\s*)(\d{1,3})")?;
        let re_backref = Regex::new(r"[（(]\s*問\s*(\d{1,3})\s*[）)]")?;

        let mut images: Vec<SupplementImage> = Vec::new();

        for (page_index, page) in pages.iter().enumerate() {
            let page_number = (page_index + 1) as u32;
            let text = normalize_fullwidth(page);

            let labels: Vec<(usize, u32, String)> = re_label
                .captures_iter(&text)
                .filter_map(|cap| {
                    let m = cap.get(0)?;
                    let number: u32 = cap.get(1)?.as_str().parse().ok()?;
                    Some((m.start(), number, m.as_str().trim().to_string()))
                })
                .collect();

            for (i, (start, number, label)) in labels.iter().enumerate() {
                if images.iter().any(|img| img.image_number == *number) {
                    continue;
                }
                let until = labels.get(i + 1).map(|l| l.0).unwrap_or(text.len());
                let segment = &text[*start..until];
                let question_refs: Vec<u32> = re_backref
                    .captures_iter(segment)
                    .filter_map(|cap| cap.get(1)?.as_str().parse().ok())
                    .collect();

                images.push(SupplementImage {
                    image_number: *number,
                    page: page_number,
                    label: label.clone(),
                    question_refs,
                });
            }
        }

        Ok(images)
    }

    /// 1 問分の別冊参照リストを構築する
    ///
    /// # 引数
    /// - `question_text`: 問題本文
    /// - `question_number`: 問番号（逆参照メタデータとの照合に使う）
    /// - `supplements`: 同一 (回, セッション) の既知の別冊画像集合
    ///
    /// # 返値
    /// 画像番号で重複排除済みの参照リスト。
    /// メタデータ駆動のリンクは、テキスト駆動で同じ画像番号が
    /// 得られていない場合に限って追加される
    pub fn link(
        &self,
        question_text: &str,
        question_number: u32,
        supplements: &[SupplementImage],
    ) -> AppResult<Vec<SupplementReference>> {
        let mut refs: Vec<SupplementReference> = Vec::new();

        // テキスト駆動: 本文中の参照マーカーを既知の別冊集合に解決する
        let text = normalize_fullwidth(question_text);
        let re_ref = Regex::new(r"別冊\s*(?:No\.?\s*|図\s*|写真\s*)?(\d{1,3})")?;
        for cap in re_ref.captures_iter(&text) {
            let (raw, number) = match (cap.get(0), cap.get(1)) {
                (Some(m), Some(n)) => match n.as_str().parse::<u32>() {
                    Ok(number) => (m.as_str().trim().to_string(), number),
                    Err(_) => continue,
                },
                _ => continue,
            };
            if refs.iter().any(|r| r.image_number == number) {
                continue;
            }
            match supplements.iter().find(|s| s.image_number == number) {
                Some(image) => refs.push(SupplementReference {
                    raw,
                    image_number: number,
                    page: image.page,
                }),
                None => {
                    debug!(
                        "問{}: 本文の別冊参照 {} に対応する画像がありません",
                        question_number, raw
                    );
                }
            }
        }

        // メタデータ駆動: 逆参照を持つ画像を追加（画像番号の重複は追加しない）
        for image in supplements {
            if image.question_refs.contains(&question_number)
                && !refs.iter().any(|r| r.image_number == image.image_number)
            {
                refs.push(SupplementReference {
                    raw: format!("別冊No.{}（推定）", image.image_number),
                    image_number: image.image_number,
                    page: image.page,
                });
            }
        }

        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(number: u32, page: u32, refs: &[u32]) -> SupplementImage {
        SupplementImage {
            image_number: number,
            page,
            label: format!("No.{}", number),
            question_refs: refs.to_vec(),
        }
    }

    #[test]
    fn test_text_driven_link() {
        let linker = SupplementLinker::new();
        let supplements = vec![image(5, 2, &[])];
        let refs = linker
            .link("別冊No.5 を参照して答えよ。", 10, &supplements)
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].image_number, 5);
        assert_eq!(refs[0].page, 2);
        assert_eq!(refs[0].raw, "別冊No.5");
    }

    #[test]
    fn test_fullwidth_reference() {
        let linker = SupplementLinker::new();
        let supplements = vec![image(12, 4, &[])];
        let refs = linker
            .link("別冊Ｎｏ．１２ の写真を見よ。", 3, &supplements)
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].image_number, 12);
    }

    #[test]
    fn test_metadata_driven_link_without_text_marker() {
        let linker = SupplementLinker::new();
        let supplements = vec![image(7, 3, &[15])];
        let refs = linker.link("本文に参照は書かれていない。", 15, &supplements).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].image_number, 7);
        assert_eq!(refs[0].raw, "別冊No.7（推定）");
    }

    #[test]
    fn test_merge_dedupes_by_image_number() {
        let linker = SupplementLinker::new();
        // テキストでもメタデータでも同じ画像 5 を指す
        let supplements = vec![image(5, 2, &[20])];
        let refs = linker
            .link("別冊No.5 および別冊No.5 を参照。", 20, &supplements)
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw, "別冊No.5");
    }

    #[test]
    fn test_unresolvable_text_reference_is_skipped() {
        let linker = SupplementLinker::new();
        let refs = linker.link("別冊No.9 を参照。", 1, &[]).unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_parse_supplement_pages() {
        let linker = SupplementLinker::new();
        let pages = vec![
            "No.1 （問3） 心電図の記録".to_string(),
            "No.2 （問7）（問8） 胸部X線像\nNo.3 病理組織像".to_string(),
        ];
        let images = linker.parse_supplement_pages(&pages).unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].question_refs, vec![3]);
        assert_eq!(images[0].page, 1);
        assert_eq!(images[1].question_refs, vec![7, 8]);
        assert_eq!(images[2].question_refs, Vec::<u32>::new());
        assert_eq!(images[2].page, 2);
    }
}
