pub mod fields;
pub mod shell;
