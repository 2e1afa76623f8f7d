pub mod password;
pub mod time;
pub mod validation;

pub use validation::{QueryParams, ValidatedJson};
