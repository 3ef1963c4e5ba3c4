use crate::config::Config;
use unicode_normalization::UnicodeNormalization;

/// Joins decoded pages into one document, one trailing newline per page.
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// Cleans decoder output before field extraction.
///
/// NFKC folds no-break and thin spaces (common thousands separators in Polish
/// reports) into plain spaces, so the number patterns see one kind of blank.
pub fn clean_text(cfg: &Config, raw: &str) -> String {
    let mut text = raw.to_string();

    if cfg.postprocess.normalize_newlines {
        text = text.replace("\r\n", "\n");
    }

    if cfg.postprocess.normalize_unicode {
        text = text.nfkc().collect::<String>();
    }

    sanitize_control_chars(&text, &cfg.postprocess.control_chars_to_sanitize)
}

fn sanitize_control_chars(s: &str, codes: &[u8]) -> String {
    if codes.is_empty() {
        return s.to_string();
    }

    let mut mask = [false; 128];
    for &code in codes {
        if (code as usize) < mask.len() {
            mask[code as usize] = true;
        }
    }

    s.chars()
        .filter(|&ch| {
            if ch == '\n' || ch == '\r' || ch == '\t' {
                return true;
            }
            let cp = ch as u32;
            cp >= 128 || !mask[cp as usize]
        })
        .collect()
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
