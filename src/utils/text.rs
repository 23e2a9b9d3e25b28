pub fn char_count(content: &str) -> i64 {
    content.chars().count() as i64
}

pub fn word_count(content: &str) -> i64 {
    content.split_whitespace().count() as i64
}

pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// Single-line preview for terminal output.
pub fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\r', "").replace('\n', " [NL] ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}
