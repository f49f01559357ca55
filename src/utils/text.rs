//! テキスト正規化ユーティリティ
//!
//! 出題 PDF は全角数字と半角数字が混在するため、パターンマッチの前に
//! 全角→半角の正規化を一度だけ行う（パターンを二重化しない）

use phf::phf_map;

/// 全角→半角の変換テーブル（数字・英字・主要記号）
static FULLWIDTH_MAP: phf::Map<char, char> = phf_map! {
    '０' => '0', '１' => '1', '２' => '2', '３' => '3', '４' => '4',
    '５' => '5', '６' => '6', '７' => '7', '８' => '8', '９' => '9',
    'ａ' => 'a', 'ｂ' => 'b', 'ｃ' => 'c', 'ｄ' => 'd', 'ｅ' => 'e',
    'ｆ' => 'f', 'ｇ' => 'g', 'ｈ' => 'h', 'ｉ' => 'i', 'ｊ' => 'j',
    'ｋ' => 'k', 'ｌ' => 'l', 'ｍ' => 'm', 'ｎ' => 'n', 'ｏ' => 'o',
    'ｐ' => 'p', 'ｑ' => 'q', 'ｒ' => 'r', 'ｓ' => 's', 'ｔ' => 't',
    'ｕ' => 'u', 'ｖ' => 'v', 'ｗ' => 'w', 'ｘ' => 'x', 'ｙ' => 'y',
    'ｚ' => 'z',
    'Ａ' => 'A', 'Ｂ' => 'B', 'Ｃ' => 'C', 'Ｄ' => 'D', 'Ｅ' => 'E',
    'Ｆ' => 'F', 'Ｇ' => 'G', 'Ｈ' => 'H', 'Ｉ' => 'I', 'Ｊ' => 'J',
    'Ｋ' => 'K', 'Ｌ' => 'L', 'Ｍ' => 'M', 'Ｎ' => 'N', 'Ｏ' => 'O',
    'Ｐ' => 'P', 'Ｑ' => 'Q', 'Ｒ' => 'R', 'Ｓ' => 'S', 'Ｔ' => 'T',
    'Ｕ' => 'U', 'Ｖ' => 'V', 'Ｗ' => 'W', 'Ｘ' => 'X', 'Ｙ' => 'Y',
    'Ｚ' => 'Z',
    '．' => '.', '，' => ',', '：' => ':', '；' => ';',
    '　' => ' ',
};

/// 丸数字→選択肢位置（1 始まり）の変換テーブル
static CIRCLED_DIGIT_MAP: phf::Map<char, u8> = phf_map! {
    '①' => 1, '②' => 2, '③' => 3, '④' => 4, '⑤' => 5,
};

/// 全角の数字・英字・記号を半角に正規化する
///
/// 対応表にない文字（かな・漢字など）はそのまま通す
pub fn normalize_fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| FULLWIDTH_MAP.get(&c).copied().unwrap_or(c))
        .collect()
}

/// 丸数字を選択肢位置（1 始まり）に変換する
pub fn circled_digit_value(c: char) -> Option<u8> {
    CIRCLED_DIGIT_MAP.get(&c).copied()
}

/// 連続する空白（改行含む）を半角スペース 1 個に畳み込む
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 長いテキストをログ表示用に切り詰める
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fullwidth_digits_and_letters() {
        assert_eq!(normalize_fullwidth("問１２"), "問12");
        assert_eq!(normalize_fullwidth("ａ，ｂ"), "a,b");
        assert_eq!(normalize_fullwidth("Ｎｏ．５"), "No.5");
    }

    #[test]
    fn test_normalize_keeps_kana_and_kanji() {
        assert_eq!(normalize_fullwidth("次のうち正しいもの"), "次のうち正しいもの");
    }

    #[test]
    fn test_circled_digit() {
        assert_eq!(circled_digit_value('①'), Some(1));
        assert_eq!(circled_digit_value('⑤'), Some(5));
        assert_eq!(circled_digit_value('a'), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n b\t\tc  "), "a b c");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
