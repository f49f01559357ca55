pub mod answer_key;
pub mod question_parser;
pub mod shuffle;
pub mod supplement_linker;
pub mod text_extractor;

pub use answer_key::AnswerKeyParser;
pub use question_parser::QuestionParser;
pub use shuffle::{apply_permutation, shuffle_choices, shuffle_choices_with_rng};
pub use supplement_linker::SupplementLinker;
pub use text_extractor::{TextExtractor, TextRun};
