//! 選択肢シャッフルサービス - 業務能力層
//!
//! 選択肢の並びをランダムに置換し、正答ラベルを新しい並びへ貼り替える。
//! 元の Question は変更せず、必ず新しいコピーを返す
//! （保存済み・履歴済みレコードを書き換えないため）

use crate::models::question::{Choice, Question, CHOICE_LABELS};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::warn;

/// 選択肢をランダムに並べ替えた新しい Question を返す
///
/// 問題ごとに独立した乱数で置換する（バッチ内で乱数状態を共有しない）
pub fn shuffle_choices(question: &Question) -> Question {
    let mut rng = rand::thread_rng();
    shuffle_choices_with_rng(question, &mut rng)
}

/// 乱数生成器を指定してシャッフルする（テスト・再現用）
pub fn shuffle_choices_with_rng<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let mut permutation: Vec<usize> = (0..question.choices.len()).collect();
    permutation.shuffle(rng);
    apply_permutation(question, &permutation)
}

/// 置換を適用した新しい Question を返す
///
/// 新しい並びに a, b, c, ... を貼り直し、旧ラベル → 新ラベルの対応表を
/// 「元のラベル」で引いて正答を貼り替える。選択肢テキストが重複していても
/// 正しく対応が取れるのはこのため
pub fn apply_permutation(question: &Question, permutation: &[usize]) -> Question {
    if !is_valid_permutation(permutation, question.choices.len()) {
        warn!(
            "{}: 置換 {:?} が選択肢数 {} と整合しないためシャッフルを見送ります",
            question.id,
            permutation,
            question.choices.len()
        );
        return question.clone();
    }

    let mut label_map: HashMap<String, String> = HashMap::new();
    let mut new_choices = Vec::with_capacity(question.choices.len());
    for (new_index, &old_index) in permutation.iter().enumerate() {
        let old = &question.choices[old_index];
        let new_label = CHOICE_LABELS[new_index].to_string();
        label_map.insert(old.label.clone(), new_label.clone());
        new_choices.push(Choice::new(new_label, old.text.clone()));
    }

    let remap = |label: &str| {
        label_map
            .get(&label.to_lowercase())
            .cloned()
            .unwrap_or_else(|| label.to_string())
    };

    Question {
        choices: new_choices,
        correct_answer: remap(&question.correct_answer),
        correct_answers: question
            .correct_answers
            .as_ref()
            .map(|answers| answers.iter().map(|l| remap(l)).collect()),
        ..question.clone()
    }
}

/// 0..len の並べ替えになっているか
fn is_valid_permutation(permutation: &[usize], len: usize) -> bool {
    if permutation.len() != len || len > CHOICE_LABELS.len() {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in permutation {
        if index >= len || seen[index] {
            return false;
        }
        seen[index] = true;
    }
    true
}
