//! ソース取得 - 基盤層
//!
//! 試験回・セッションから規約に沿ったファイル名を組み立て、
//! ローカルディレクトリまたはリモートのベース URL からバイト列を取得する。
//! 取得だけを担い、中身の解釈は上位層に任せる

use crate::error::{AppError, AppResult, SourceError};
use crate::models::question::Session;
use std::path::PathBuf;
use tracing::debug;

/// ソースの置き場所
#[derive(Debug, Clone)]
enum SourceLocation {
    Local(PathBuf),
    Remote(String),
}

/// ソース取得器
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    location: SourceLocation,
    client: reqwest::Client,
}

impl SourceFetcher {
    /// ベース指定から生成する
    ///
    /// `http://` / `https://` で始まる場合はリモート、それ以外は
    /// ローカルディレクトリとして扱う
    pub fn new(base: &str) -> Self {
        let location = if base.starts_with("http://") || base.starts_with("https://") {
            SourceLocation::Remote(base.trim_end_matches('/').to_string())
        } else {
            SourceLocation::Local(PathBuf::from(base))
        };
        Self {
            location,
            client: reqwest::Client::new(),
        }
    }

    // ========== ファイル名規約 ==========

    /// 構造化 JSON のファイル名（例: 30_am.json）
    pub fn structured_name(exam_number: u32, session: Session) -> String {
        format!("{}_{}.json", exam_number, session.code())
    }

    /// 問題 PDF のファイル名（例: 30_am_問題.pdf）
    pub fn question_pdf_name(exam_number: u32, session: Session) -> String {
        format!("{}_{}_問題.pdf", exam_number, session.code())
    }

    /// 解答 PDF のファイル名（両セッション共通、例: 30_解答.pdf）
    pub fn answer_key_name(exam_number: u32) -> String {
        format!("{}_解答.pdf", exam_number)
    }

    /// 別冊 PDF のファイル名（例: 30_am_別冊.pdf）
    pub fn supplement_name(exam_number: u32, session: Session) -> String {
        format!("{}_{}_別冊.pdf", exam_number, session.code())
    }

    /// 構造化 JSON の解決済みパス（案内メッセージ用）
    pub fn structured_path(&self, exam_number: u32, session: Session) -> String {
        self.resolve(&Self::structured_name(exam_number, session))
    }

    fn resolve(&self, name: &str) -> String {
        match &self.location {
            SourceLocation::Local(dir) => dir.join(name).to_string_lossy().into_owned(),
            SourceLocation::Remote(base) => format!("{}/{}", base, name),
        }
    }

    // ========== 取得 ==========

    /// 構造化 JSON を取得する
    pub async fn fetch_structured(&self, exam_number: u32, session: Session) -> AppResult<Vec<u8>> {
        self.fetch(&Self::structured_name(exam_number, session)).await
    }

    /// 問題 PDF を取得する
    pub async fn fetch_question_pdf(
        &self,
        exam_number: u32,
        session: Session,
    ) -> AppResult<Vec<u8>> {
        self.fetch(&Self::question_pdf_name(exam_number, session)).await
    }

    /// 解答 PDF を取得する
    pub async fn fetch_answer_key(&self, exam_number: u32) -> AppResult<Vec<u8>> {
        self.fetch(&Self::answer_key_name(exam_number)).await
    }

    /// 別冊 PDF を取得する
    pub async fn fetch_supplement(&self, exam_number: u32, session: Session) -> AppResult<Vec<u8>> {
        self.fetch(&Self::supplement_name(exam_number, session)).await
    }

    async fn fetch(&self, name: &str) -> AppResult<Vec<u8>> {
        match &self.location {
            SourceLocation::Local(dir) => {
                let path = dir.join(name);
                if !path.exists() {
                    return Err(AppError::source_not_found(path.to_string_lossy()));
                }
                debug!("読み込み: {}", path.display());
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| AppError::fetch_failed(path.to_string_lossy(), e))
            }
            SourceLocation::Remote(base) => {
                let url = format!("{}/{}", base, name);
                debug!("取得: {}", url);
                let response = self.client.get(&url).send().await?;
                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(AppError::source_not_found(url));
                }
                if !status.is_success() {
                    return Err(AppError::Source(SourceError::HttpStatus {
                        url,
                        status: status.as_u16(),
                    }));
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_conventions() {
        assert_eq!(SourceFetcher::structured_name(30, Session::Morning), "30_am.json");
        assert_eq!(
            SourceFetcher::question_pdf_name(30, Session::Afternoon),
            "30_pm_問題.pdf"
        );
        assert_eq!(SourceFetcher::answer_key_name(31), "31_解答.pdf");
        assert_eq!(
            SourceFetcher::supplement_name(30, Session::Morning),
            "30_am_別冊.pdf"
        );
    }

    #[tokio::test]
    async fn test_local_fetch_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(&dir.path().to_string_lossy());
        let err = fetcher.fetch_structured(30, Session::Morning).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Source(SourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_fetch_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("30_am.json"), b"{}").unwrap();
        let fetcher = SourceFetcher::new(&dir.path().to_string_lossy());
        let bytes = fetcher.fetch_structured(30, Session::Morning).await.unwrap();
        assert_eq!(bytes, b"{}");
    }
}
