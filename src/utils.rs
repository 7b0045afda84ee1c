const CAPTION_MAX_CHARS: usize = 20;
const CAPTION_KEEP_CHARS: usize = 17;

/// Cuts long captions to 17 characters plus an ellipsis. Counts chars, not bytes.
pub fn truncate_caption(text: &str) -> String {
    if text.chars().count() <= CAPTION_MAX_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(CAPTION_KEEP_CHARS).collect();
    cut.push_str("...");
    cut
}
