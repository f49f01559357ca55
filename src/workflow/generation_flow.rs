//! 問題生成フロー - 流れ層
//!
//! 1 つの (回, セッション) を正規化済み Question 列へ変換する。
//!
//! ## 状態遷移
//!
//! 1. **TryStructured**: 構造化 JSON があり 1 問以上得られれば即成功
//! 2. **TryTextExtraction**: 解答 PDF と問題 PDF を抽出して組み立てる。
//!    問題 PDF が使えない場合は構造化 JSON をもう一度だけ確認してから
//!    案内付きの致命エラーにする
//!
//! 各状態は 1 回の呼び出しで高々 1 度しか試行しない（リトライループなし）。
//! 個々の問の解析失敗はプレースホルダへ劣化させ、セッション全体は落とさない。
//! セッション致命となるのは解答キーの欠如・全滅と、問題ソースの完全な枯渇のみ

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::SourceFetcher;
use crate::models::category::CategoryTable;
use crate::models::question::{
    AnswerKeyEntry, Question, QuestionOrigin, SupplementImage,
};
use crate::models::structured::StructuredExam;
use crate::services::{AnswerKeyParser, QuestionParser, SupplementLinker, TextExtractor};
use crate::utils::truncate_text;
use crate::workflow::session_ctx::SessionCtx;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 1 セッション分の生成結果
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub questions: Vec<Question>,
    /// プレースホルダへ劣化した問の数
    ///
    /// 呼び出し側はこの値で劣化セッションを受け入れるか判断できる
    pub placeholder_count: usize,
    /// 構造化ソース由来かどうか
    pub from_structured: bool,
}

/// 問題生成フロー
///
/// - 1 つの (回, セッション) の生成手順だけを編成する
/// - リソースの並行管理はしない（編成層の仕事）
/// - 内部は直列：抽出 → 解答解析 → 問題解析 → 別冊リンク
pub struct GenerationFlow {
    fetcher: SourceFetcher,
    extractor: TextExtractor,
    answer_key: AnswerKeyParser,
    question_parser: QuestionParser,
    supplement_linker: SupplementLinker,
    category_table: CategoryTable,
}

impl GenerationFlow {
    /// 新しい生成フローを作る
    pub fn new(config: &Config, category_table: CategoryTable) -> Self {
        Self {
            fetcher: SourceFetcher::new(&config.source_base),
            extractor: TextExtractor::with_threshold(config.min_content_chars),
            answer_key: AnswerKeyParser::new(),
            question_parser: QuestionParser::new(),
            supplement_linker: SupplementLinker::new(),
            category_table,
        }
    }

    /// 1 セッション分を生成する
    pub async fn run(&self, ctx: &SessionCtx) -> AppResult<GenerationReport> {
        info!("[{}] 🚀 生成を開始", ctx);

        // ========== 状態 1: 構造化 JSON ==========
        if let Some(questions) = self.try_structured(ctx).await {
            if !questions.is_empty() {
                info!(
                    "[{}] ✓ 構造化ソースから {} 問を読み込みました",
                    ctx,
                    questions.len()
                );
                return Ok(GenerationReport {
                    questions,
                    placeholder_count: 0,
                    from_structured: true,
                });
            }
        }

        info!("[{}] 構造化ソースなし。PDF 抽出へフォールバック", ctx);

        // ========== 状態 2: PDF テキスト抽出 ==========
        self.try_text_extraction(ctx).await
    }

    /// 構造化 JSON ソースを試す
    ///
    /// 不在・取得失敗・JSON 不正はすべて「ソース欠如」として None を返す
    /// （フォールバック判定のため、ここでは致命にしない）
    async fn try_structured(&self, ctx: &SessionCtx) -> Option<Vec<Question>> {
        let bytes = match self
            .fetcher
            .fetch_structured(ctx.exam_number, ctx.session)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("[{}] 構造化ソースを取得できません: {}", ctx, e);
                return None;
            }
        };

        let path = self.fetcher.structured_path(ctx.exam_number, ctx.session);
        let exam: StructuredExam = match serde_json::from_slice(&bytes) {
            Ok(exam) => exam,
            Err(e) => {
                warn!(
                    "[{}] ⚠️ {}",
                    ctx,
                    AppError::malformed_structured(&path, e)
                );
                return None;
            }
        };

        if exam.exam_number != ctx.exam_number || exam.session != ctx.session {
            warn!(
                "[{}] ⚠️ 構造化ソースのヘッダが要求と一致しません (第{}回 {})",
                ctx,
                exam.exam_number,
                exam.session.label()
            );
        }

        // レコード自身が正答を持たない問がある場合に限り、
        // 解答キーを別途ロードして補完に使う
        let answer_map = if exam
            .questions
            .iter()
            .all(|q| q.correct_answer.is_some() || q.correct_answers.is_some())
        {
            HashMap::new()
        } else {
            self.load_answer_map(ctx).await
        };

        Some(exam.into_questions(&self.category_table, &answer_map))
    }

    /// 解答キーを「問番号 → 正答ラベル列」のマップとしてロードする
    ///
    /// 構造化パスの補完専用。失敗しても空マップを返すだけで致命にしない
    async fn load_answer_map(&self, ctx: &SessionCtx) -> HashMap<u32, Vec<String>> {
        let bytes = match self.fetcher.fetch_answer_key(ctx.exam_number).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("[{}] 補完用の解答キーを取得できません: {}", ctx, e);
                return HashMap::new();
            }
        };
        let text = match self.extractor.extract_text(&bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("[{}] 補完用の解答キーを抽出できません: {}", ctx, e);
                return HashMap::new();
            }
        };
        match self
            .answer_key
            .parse_session(&text, ctx.exam_number, ctx.session)
        {
            Ok(entries) => entries
                .into_iter()
                .map(|e| (e.question_number, e.answers))
                .collect(),
            Err(e) => {
                debug!("[{}] 補完用の解答キーを解析できません: {}", ctx, e);
                HashMap::new()
            }
        }
    }

    /// PDF テキスト抽出で組み立てる
    async fn try_text_extraction(&self, ctx: &SessionCtx) -> AppResult<GenerationReport> {
        // 解答キーは必須。取得不能・全滅はそのままセッション致命
        let key_bytes = self.fetcher.fetch_answer_key(ctx.exam_number).await?;
        let key_text = self.extractor.extract_text(&key_bytes)?;
        let entries = self
            .answer_key
            .parse_session(&key_text, ctx.exam_number, ctx.session)?;
        info!("[{}] ✓ 解答キーから {} 問分の正答を解析", ctx, entries.len());

        // 問題 PDF。取得不能・抽出不能なら構造化ソースを再確認してから致命
        let question_bytes = match self
            .fetcher
            .fetch_question_pdf(ctx.exam_number, ctx.session)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => return self.retry_structured_or_fail(ctx, e).await,
        };
        let pdf_name = SourceFetcher::question_pdf_name(ctx.exam_number, ctx.session);
        let question_text = match self.extractor.extract_text_checked(&question_bytes, &pdf_name) {
            Ok(text) => text,
            Err(e) => return self.retry_structured_or_fail(ctx, e).await,
        };
        info!(
            "[{}] ✓ 問題 PDF から {} 文字を抽出",
            ctx,
            question_text.chars().count()
        );

        // 別冊は任意。無ければ空集合で続行
        let supplements = self.load_supplements(ctx).await;
        if !supplements.is_empty() {
            info!("[{}] ✓ 別冊画像 {} 件を認識", ctx, supplements.len());
        }

        // 解答エントリごとに問題を組み立てる。
        // 個々の解析失敗はプレースホルダへ劣化させ、ここでは中断しない
        let mut questions = Vec::with_capacity(entries.len());
        let mut placeholder_count = 0;
        for entry in entries {
            let (question, is_placeholder) =
                self.assemble_question(ctx, entry, &question_text, &supplements);
            if is_placeholder {
                placeholder_count += 1;
            }
            questions.push(question);
        }

        if placeholder_count > 0 {
            warn!(
                "[{}] ⚠️ {} / {} 問がプレースホルダに劣化しています",
                ctx,
                placeholder_count,
                questions.len()
            );
        }
        info!("[{}] ✅ {} 問を組み立てました", ctx, questions.len());

        Ok(GenerationReport {
            questions,
            placeholder_count,
            from_structured: false,
        })
    }

    /// 問題 PDF が使えない場合の最終フォールバック
    ///
    /// 一時的な読み取り失敗で構造化ソースを見逃した可能性に備えて
    /// もう一度だけ確認し、それでも無ければ案内付きの致命エラーにする
    async fn retry_structured_or_fail(
        &self,
        ctx: &SessionCtx,
        cause: AppError,
    ) -> AppResult<GenerationReport> {
        warn!("[{}] ⚠️ 問題 PDF が利用できません: {}", ctx, cause);
        info!("[{}] 構造化ソースを再確認します", ctx);

        if let Some(questions) = self.try_structured(ctx).await {
            if !questions.is_empty() {
                info!(
                    "[{}] ✓ 再確認で構造化ソースから {} 問を読み込みました",
                    ctx,
                    questions.len()
                );
                return Ok(GenerationReport {
                    questions,
                    placeholder_count: 0,
                    from_structured: true,
                });
            }
        }

        Err(AppError::no_usable_source(
            ctx.exam_number,
            ctx.session,
            self.fetcher.structured_path(ctx.exam_number, ctx.session),
        ))
    }

    /// 別冊画像レコードをロードする（任意ソース、失敗は空集合）
    async fn load_supplements(&self, ctx: &SessionCtx) -> Vec<SupplementImage> {
        let bytes = match self
            .fetcher
            .fetch_supplement(ctx.exam_number, ctx.session)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("[{}] 別冊なし: {}", ctx, e);
                return Vec::new();
            }
        };
        let pages = match self.extractor.extract_pages(&bytes) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("[{}] ⚠️ 別冊を抽出できません: {}", ctx, e);
                return Vec::new();
            }
        };
        match self.supplement_linker.parse_supplement_pages(&pages) {
            Ok(images) => images,
            Err(e) => {
                warn!("[{}] ⚠️ 別冊を解析できません: {}", ctx, e);
                Vec::new()
            }
        }
    }

    /// 解答エントリ 1 件から Question を組み立てる
    ///
    /// 返値の bool はプレースホルダへ劣化したかどうか
    fn assemble_question(
        &self,
        ctx: &SessionCtx,
        entry: AnswerKeyEntry,
        question_text: &str,
        supplements: &[SupplementImage],
    ) -> (Question, bool) {
        let number = entry.question_number;
        let mut section = self.question_parser.parse_section(question_text, number);

        // 正答ラベルが抽出した選択肢に存在しない場合は、認識結果を
        // 信用できないためプレースホルダ（a〜e を持つ）へ劣化させる
        let labels: Vec<&str> = section.choices.iter().map(|c| c.label.as_str()).collect();
        if !section.is_placeholder
            && !entry.answers.iter().all(|a| labels.contains(&a.as_str()))
        {
            warn!(
                "[{}] ⚠️ 問{} の正答 {:?} が抽出選択肢 {:?} と整合しません",
                ctx, number, entry.answers, labels
            );
            section = self.question_parser.placeholder(number);
        }

        if section.is_placeholder {
            debug!("[{}] 問{} はプレースホルダです", ctx, number);
        } else {
            debug!(
                "[{}] 問{}: {}",
                ctx,
                number,
                truncate_text(&section.text, 40)
            );
        }

        let supplements_refs = match self
            .supplement_linker
            .link(&section.text, number, supplements)
        {
            Ok(refs) => refs,
            Err(e) => {
                warn!("[{}] ⚠️ 問{} の別冊リンクに失敗: {}", ctx, number, e);
                Vec::new()
            }
        };

        let category = self.category_table.classify(ctx.session, number);

        let primary = entry
            .answers
            .first()
            .cloned()
            .unwrap_or_else(|| "a".to_string());
        let correct_answers = if entry.answers.len() > 1 {
            Some(entry.answers)
        } else {
            None
        };

        let is_placeholder = section.is_placeholder;
        let question = Question {
            id: Question::make_id(ctx.exam_number, ctx.session, number),
            exam_number: ctx.exam_number,
            session: ctx.session,
            number,
            text: section.text,
            choices: section.choices,
            correct_answer: primary,
            correct_answers,
            category: Some(category),
            supplements: supplements_refs,
            origin: QuestionOrigin::PdfExtraction,
        };
        (question, is_placeholder)
    }
}
