/// Covered text as a single line.
pub fn collapse_newlines(input: &str) -> String {
    input.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Document name without its `.txt` extension (and anything after it).
pub fn strip_text_extension(name: &str) -> &str {
    match name.find(".txt") {
        Some(index) => &name[..index],
        None => name,
    }
}
