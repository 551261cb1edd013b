// src/utils/html.rs

/// Clean instructor-authored text with the ammonia library.
///
/// Whitelist-based: safe formatting tags survive, `<script>`, `<iframe>`
/// and event-handler attributes are removed.
///
/// Only free text goes through here (descriptions, question text,
/// explanations). Option strings and correct answers are stored verbatim
/// because scoring compares them byte for byte.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Optional variant for nullable columns.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}
