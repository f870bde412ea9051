pub mod camelcase;
pub mod json;
