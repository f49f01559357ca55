//! レンダリング済み画像キャッシュ - 基盤層
//!
//! (回, セッション, ページ, 倍率) をキーとするメモリ内キャッシュ。
//! エントリは書き込み後に変更されない。同じキーへ競合して書き込んでも
//! 内容は同一になるため、後勝ちで上書きされても安全で、
//! このキャッシュにそれ以上のロック規律は要らない

use crate::models::question::Session;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// キャッシュキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pub exam_number: u32,
    pub session: Session,
    pub page: u32,
    /// レンダリング倍率（パーセント）
    pub scale_percent: u32,
}

/// 画像キャッシュ
///
/// レンダリング協力層（表示側）へ渡して使う明示的なサービスオブジェクト
#[derive(Debug, Default)]
pub struct ImageCache {
    inner: RwLock<HashMap<ImageKey, Arc<Vec<u8>>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュから読む
    pub fn get(&self, key: &ImageKey) -> Option<Arc<Vec<u8>>> {
        match self.inner.read() {
            Ok(map) => map.get(key).cloned(),
            Err(_) => None,
        }
    }

    /// キャッシュへ書き込む（既存エントリは先勝ちで残す）
    pub fn insert(&self, key: ImageKey, bytes: Vec<u8>) -> Arc<Vec<u8>> {
        let value = Arc::new(bytes);
        if let Ok(mut map) = self.inner.write() {
            return map.entry(key).or_insert_with(|| value.clone()).clone();
        }
        value
    }

    /// リードスルー取得
    ///
    /// ミス時に `render` を呼んで生成し、結果をキャッシュへ入れて返す
    pub fn get_or_insert_with<F>(&self, key: ImageKey, render: F) -> Arc<Vec<u8>>
    where
        F: FnOnce() -> Vec<u8>,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        self.insert(key, render())
    }

    /// 保持エントリ数
    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
