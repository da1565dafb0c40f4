pub mod document;
pub mod habit;
pub mod mood;
pub mod user;
