//! 生成タスクのコンテキスト
//!
//! 「どの回のどのセッションを生成しているか」を封じ込める

use crate::models::question::Session;
use std::fmt::Display;

/// 生成タスクコンテキスト
#[derive(Debug, Clone)]
pub struct SessionCtx {
    /// 試験回番号
    pub exam_number: u32,
    /// セッション
    pub session: Session,
    /// タスク番号（ログ表示専用）
    pub task_index: usize,
}

impl SessionCtx {
    pub fn new(exam_number: u32, session: Session, task_index: usize) -> Self {
        Self {
            exam_number,
            session,
            task_index,
        }
    }
}

impl Display for SessionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "第{}回 {}", self.exam_number, self.session.label())
    }
}
