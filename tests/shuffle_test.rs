//! 選択肢シャッフルの統合テスト
//!
//! ラベルでの採点はシャッフルで貼り替わるが、
//! 「どのテキストが正答か」はシャッフル不変であることを確認する

use kakomon::{apply_permutation, Choice, Question, QuestionOrigin, Session};
use kakomon::services::shuffle_choices_with_rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sample_question() -> Question {
    Question {
        id: Question::make_id(30, Session::Morning, 1),
        exam_number: 30,
        session: Session::Morning,
        number: 1,
        text: "次のうち正しいものはどれか。".to_string(),
        choices: vec![
            Choice::new("a", "X"),
            Choice::new("b", "Y"),
            Choice::new("c", "Z"),
            Choice::new("d", "W"),
        ],
        correct_answer: "b".to_string(),
        correct_answers: None,
        category: None,
        supplements: Vec::new(),
        origin: QuestionOrigin::Structured,
    }
}

#[test]
fn test_permutation_moving_correct_choice_to_front() {
    let q = sample_question();
    // Y（正答）を先頭に動かす置換
    let shuffled = apply_permutation(&q, &[1, 0, 2, 3]);

    assert_eq!(shuffled.correct_answer, "a");
    assert_eq!(shuffled.choices[0].text, "Y");
    // 元の Question は不変（コピーオンライト）
    assert_eq!(q.correct_answer, "b");
    assert_eq!(q.choices[0].text, "X");
}

#[test]
fn test_grading_by_text_is_shuffle_invariant() {
    let q = sample_question();

    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let shuffled = shuffle_choices_with_rng(&q, &mut rng);

        // 選択肢のテキスト集合は同一
        let mut before: Vec<&str> = q.choices.iter().map(|c| c.text.as_str()).collect();
        let mut after: Vec<&str> = shuffled.choices.iter().map(|c| c.text.as_str()).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);

        // 正答テキスト集合も同一
        assert_eq!(q.correct_choice_texts(), vec!["Y"]);
        assert_eq!(shuffled.correct_choice_texts(), vec!["Y"]);

        // どの選択肢テキストを選んでも、採点結果は元の問題と一致する
        for choice in &shuffled.choices {
            let original = q
                .choices
                .iter()
                .find(|c| c.text == choice.text)
                .expect("シャッフルでテキストが失われた");
            assert_eq!(
                shuffled.is_correct_label(&choice.label),
                q.is_correct_label(&original.label)
            );
        }

        // ラベルは a から詰め直される
        let labels: Vec<&str> = shuffled.choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c", "d"]);
    }
}

#[test]
fn test_multi_answer_shuffle_consistency() {
    let mut q = sample_question();
    q.correct_answer = "a".to_string();
    q.correct_answers = Some(vec!["a".to_string(), "d".to_string()]);

    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let shuffled = shuffle_choices_with_rng(&q, &mut rng);

        // 正答テキスト集合（X, W）はシャッフル不変
        let mut texts = shuffled.correct_choice_texts();
        texts.sort_unstable();
        assert_eq!(texts, vec!["W", "X"]);

        // 複数正答の各ラベルは選択肢に存在する
        let answers = shuffled.correct_answers.as_ref().expect("複数正答が消えた");
        assert_eq!(answers.len(), 2);
        for a in answers {
            assert!(shuffled.choices.iter().any(|c| &c.label == a));
        }
        assert_eq!(&shuffled.correct_answer, &answers[0]);
    }
}

#[test]
fn test_duplicate_choice_texts_remap_by_label() {
    // テキストが重複していても、ラベル同定で正しく貼り替わる
    let mut q = sample_question();
    q.choices = vec![
        Choice::new("a", "同じ文言"),
        Choice::new("b", "同じ文言"),
        Choice::new("c", "異なる文言"),
    ];
    q.correct_answer = "b".to_string();

    // b を末尾へ動かす置換
    let shuffled = apply_permutation(&q, &[0, 2, 1]);
    assert_eq!(shuffled.correct_answer, "c");
    assert_eq!(shuffled.choices[2].text, "同じ文言");
}
