pub mod category;
pub mod loaders;
pub mod question;
pub mod structured;

pub use category::{Category, CategoryRange, CategoryTable};
pub use loaders::{load_category_table, load_category_table_or_builtin};
pub use question::{
    AnswerKeyEntry, Choice, ParsedQuestionSection, Question, QuestionOrigin, Session,
    SupplementImage, SupplementReference,
};
pub use structured::{StructuredChoices, StructuredExam, StructuredQuestion};
