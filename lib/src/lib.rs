pub mod ai;
pub mod answer;
pub mod data;
pub mod extract;
pub mod helpers;
pub mod raw_data;
pub mod session;
pub mod sync;

pub use answer::{infer_type, storage_form, ui_form, QuestionType};
pub use data::{QuestionBankData, QuestionData};
pub use extract::{extract, ExtractionResult};
