//! Text post-processing for model replies

/// Strip markdown code fences from a model reply.
///
/// If the reply contains a fenced block, the body of the first block is
/// returned (the language tag line is dropped). Otherwise the trimmed reply
/// is returned unchanged.
pub fn clean_code_block(content: &str) -> String {
    let trimmed = content.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after = &trimmed[start + 3..];
    let body = match after.find('\n') {
        Some(nl) if !after[..nl].contains("```") => &after[nl + 1..],
        // single-line fence: ```code```
        _ => after,
    };
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };

    body.trim_start_matches(['\n', '\r']).trim_end().to_string()
}

/// Locate the JSON object in a reply, tolerating fences and surrounding prose.
pub fn extract_json_object(content: &str) -> String {
    let cleaned = clean_code_block(content);
    if cleaned.starts_with('{') {
        return cleaned;
    }
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned,
    }
}

/// Cut a string to at most `max_len` bytes on a char boundary
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
