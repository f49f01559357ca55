use crate::models::question::Session;
use serde::{Deserialize, Serialize};

/// 出題分野
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 基礎
    Basic = 1,
    /// 臨床
    Clinical = 2,
    /// 衛生
    Hygiene = 3,
    /// 実務
    Practice = 4,
    /// 総合（既定）
    General = 9,
}

impl Category {
    /// 分野コード
    pub fn code(self) -> i16 {
        self as i16
    }

    /// 表示名
    pub fn name(self) -> &'static str {
        match self {
            Category::Basic => "基礎",
            Category::Clinical => "臨床",
            Category::Hygiene => "衛生",
            Category::Practice => "実務",
            Category::General => "総合",
        }
    }

    /// コードから分野を解析
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Category::Basic),
            2 => Some(Category::Clinical),
            3 => Some(Category::Hygiene),
            4 => Some(Category::Practice),
            9 => Some(Category::General),
            _ => None,
        }
    }

    /// 文字列から分野を解析（英語キー・表示名の両対応）
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" | "基礎" => Some(Category::Basic),
            "clinical" | "臨床" => Some(Category::Clinical),
            "hygiene" | "衛生" => Some(Category::Hygiene),
            "practice" | "実務" => Some(Category::Practice),
            "general" | "総合" => Some(Category::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 問番号範囲 → 分野 の対応（両端含む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRange {
    pub start: u32,
    pub end: u32,
    pub category: Category,
}

/// セッション別の分野範囲テーブル
///
/// 範囲は順序付きで、最初に合致した範囲が勝つ。
/// どの範囲にも合致しない場合はセッション既定分野を返す（失敗しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    morning: Vec<CategoryRange>,
    afternoon: Vec<CategoryRange>,
    morning_default: Category,
    afternoon_default: Category,
}

impl CategoryTable {
    pub fn new(
        morning: Vec<CategoryRange>,
        afternoon: Vec<CategoryRange>,
        morning_default: Category,
        afternoon_default: Category,
    ) -> Self {
        Self {
            morning,
            afternoon,
            morning_default,
            afternoon_default,
        }
    }

    /// 組み込みの既定テーブル
    ///
    /// 設定ファイル（TOML）で上書きできる
    pub fn builtin() -> Self {
        Self {
            morning: vec![
                CategoryRange {
                    start: 1,
                    end: 25,
                    category: Category::Basic,
                },
                CategoryRange {
                    start: 26,
                    end: 50,
                    category: Category::Clinical,
                },
                CategoryRange {
                    start: 51,
                    end: 60,
                    category: Category::Hygiene,
                },
            ],
            afternoon: vec![
                CategoryRange {
                    start: 1,
                    end: 30,
                    category: Category::Clinical,
                },
                CategoryRange {
                    start: 31,
                    end: 60,
                    category: Category::Practice,
                },
            ],
            morning_default: Category::General,
            afternoon_default: Category::General,
        }
    }

    /// 問番号から分野を引く（純粋な参照、失敗しない）
    pub fn classify(&self, session: Session, question_number: u32) -> Category {
        let (ranges, default) = match session {
            Session::Morning => (&self.morning, self.morning_default),
            Session::Afternoon => (&self.afternoon, self.afternoon_default),
        };
        ranges
            .iter()
            .find(|r| r.start <= question_number && question_number <= r.end)
            .map(|r| r.category)
            .unwrap_or(default)
    }
}
