pub mod category_loader;

pub use category_loader::{load_category_table, load_category_table_or_builtin};
