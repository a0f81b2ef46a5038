mod text;

pub use text::{collapse_newlines, strip_text_extension};
