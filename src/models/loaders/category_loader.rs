use crate::models::category::{Category, CategoryRange, CategoryTable};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// 分野範囲テーブルの TOML 表現
///
/// ```toml
/// [morning]
/// default = "general"
/// ranges = [
///     { start = 1, end = 25, category = "basic" },
///     { start = 26, end = 50, category = "clinical" },
/// ]
///
/// [afternoon]
/// default = "general"
/// ranges = [{ start = 1, end = 60, category = "practice" }]
/// ```
#[derive(Debug, Deserialize)]
struct CategoryTableFile {
    morning: SessionRanges,
    afternoon: SessionRanges,
}

#[derive(Debug, Deserialize)]
struct SessionRanges {
    default: Category,
    #[serde(default)]
    ranges: Vec<CategoryRange>,
}

/// TOML ファイルから分野範囲テーブルを読み込む
pub async fn load_category_table(path: &Path) -> Result<CategoryTable> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("分野テーブルを読み込めません: {}", path.display()))?;

    let file: CategoryTableFile = toml::from_str(&content)
        .with_context(|| format!("分野テーブルを解析できません: {}", path.display()))?;

    Ok(CategoryTable::new(
        file.morning.ranges,
        file.afternoon.ranges,
        file.morning.default,
        file.afternoon.default,
    ))
}

/// 分野範囲テーブルを読み込む（パス未指定なら組み込み既定）
pub async fn load_category_table_or_builtin(path: Option<&str>) -> Result<CategoryTable> {
    match path {
        Some(p) => {
            let table = load_category_table(Path::new(p)).await?;
            info!("✓ 分野テーブルを読み込みました: {}", p);
            Ok(table)
        }
        None => Ok(CategoryTable::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Session;

    #[tokio::test]
    async fn test_load_category_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.toml");
        let toml_text = r#"
[morning]
default = "general"
ranges = [
    { start = 1, end = 10, category = "basic" },
    { start = 11, end = 20, category = "clinical" },
]

[afternoon]
default = "practice"
ranges = []
"#;
        std::fs::write(&path, toml_text).unwrap();

        let table = load_category_table(&path).await.unwrap();
        assert_eq!(table.classify(Session::Morning, 5), Category::Basic);
        assert_eq!(table.classify(Session::Morning, 15), Category::Clinical);
        assert_eq!(table.classify(Session::Morning, 99), Category::General);
        assert_eq!(table.classify(Session::Afternoon, 1), Category::Practice);
    }

    #[tokio::test]
    async fn test_load_or_builtin_without_path() {
        let table = load_category_table_or_builtin(None).await.unwrap();
        assert_eq!(table, CategoryTable::builtin());
    }
}
