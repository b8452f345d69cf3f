//! Text preparation for the speech endpoint.
//!
//! The endpoint reads at most ~100 characters per request, so OCR output has
//! to be cut into pieces before synthesis. Cutting at arbitrary offsets makes
//! the voice stop mid-word; instead the text is cut in three passes:
//!
//! 1. **Clean** — undo OCR line wrapping: join words hyphenated across a line
//!    break, fold single line breaks into spaces, keep paragraph breaks.
//! 2. **Split** — cut after sentence punctuation followed by whitespace and at
//!    paragraph breaks, so each piece ends where a speaker would pause.
//! 3. **Fit** — pieces still longer than the limit are cut at the last space
//!    before it (or hard-cut if there is none); short neighbours are merged
//!    back together to keep the number of requests low.
//!
//! Pieces with no letters or digits (stray punctuation from OCR noise) are
//! dropped. All lengths are counted in `char`s, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

static CRLF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("valid regex"));

static HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-[ \t]*\n[ \t]*(\w)").expect("valid regex"));

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\n(?:[ \t]*\n)+[ \t]*").expect("valid regex"));

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("valid regex"));

static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{00A0}\u{200B}\u{FEFF}]+").expect("valid regex"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?;:,…。！？；：，、]+\s+|\u{2029}").expect("valid regex"));

/// Paragraph marker used between the clean and split passes.
const PARAGRAPH: &str = "\u{2029}";

/// Clean, split and fit `text` into chunks of at most `max_chars` characters.
pub fn prepare_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let cleaned = clean_text(text);
    let pieces: Vec<String> = split_sentences(&cleaned)
        .into_iter()
        .flat_map(|s| fit_piece(&s, max_chars))
        .filter(|p| p.chars().any(char::is_alphanumeric))
        .collect();
    merge_pieces(pieces, max_chars)
}

/// Undo OCR line wrapping and normalise whitespace.
pub fn clean_text(text: &str) -> String {
    let s = CRLF.replace_all(text, "\n");
    let s = HYPHEN_BREAK.replace_all(&s, "$1$2");
    let s = PARAGRAPH_BREAK.replace_all(&s, PARAGRAPH);
    let s = LINE_BREAK.replace_all(&s, " ");
    let s = HORIZONTAL_SPACE.replace_all(&s, " ");
    s.trim().to_string()
}

/// Cut after sentence punctuation and at paragraph markers.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(text) {
        push_trimmed(&mut out, &text[last_end..mat.end()]);
        last_end = mat.end();
    }
    push_trimmed(&mut out, &text[last_end..]);
    out
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim_matches(|c: char| c.is_whitespace() || c == '\u{2029}');
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Cut a piece longer than `max_chars` at word boundaries.
fn fit_piece(piece: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = piece.trim();

    while rest.chars().count() > max_chars {
        // Byte offset just past the first `max_chars` characters.
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        // Prefer the last space inside the window; include the character at
        // `limit` so a space right after the window also counts.
        let window_end = rest[limit..]
            .chars()
            .next()
            .map(|c| limit + c.len_utf8())
            .unwrap_or(limit);
        let cut = match rest[..window_end].rfind(' ') {
            Some(i) if i > 0 => i,
            _ => limit,
        };

        let head = rest[..cut].trim_end();
        if !head.is_empty() {
            out.push(head.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Greedily join neighbouring pieces while they fit in `max_chars`.
fn merge_pieces(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(pieces.len());

    for piece in pieces {
        if let Some(last) = out.last_mut() {
            if last.chars().count() + 1 + piece.chars().count() <= max_chars {
                last.push(' ');
                last.push_str(&piece);
                continue;
            }
        }
        out.push(piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(prepare_chunks("Hello world.\n", 100), vec!["Hello world."]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(prepare_chunks("  \n\t \n", 100).is_empty());
        assert!(prepare_chunks("- . ,\n|", 100).is_empty());
    }

    #[test]
    fn hyphenated_line_break_is_joined() {
        assert_eq!(clean_text("exam-\nple text"), "example text");
    }

    #[test]
    fn single_line_breaks_become_spaces() {
        assert_eq!(clean_text("one\ntwo\r\nthree"), "one two three");
    }

    #[test]
    fn paragraphs_split_chunks_even_without_punctuation() {
        let chunks = prepare_chunks("Title\n\nBody text", 5);
        assert_eq!(chunks, vec!["Title", "Body", "text"]);
    }

    #[test]
    fn splits_on_sentence_punctuation_then_merges() {
        let text = "First sentence. Second one! Third? Fourth part, with a comma.";
        let chunks = prepare_chunks(text, 30);
        assert_eq!(
            chunks,
            vec!["First sentence. Second one!", "Third? Fourth part,", "with a comma."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
    }

    #[test]
    fn decimals_are_not_split() {
        let chunks = prepare_chunks("Pi is 3.14 roughly", 100);
        assert_eq!(chunks, vec!["Pi is 3.14 roughly"]);
    }

    #[test]
    fn long_sentence_is_cut_at_spaces() {
        let text = "aaaa bbbb cccc dddd eeee";
        let chunks = prepare_chunks(text, 10);
        assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd", "eeee"]);
    }

    #[test]
    fn word_longer_than_limit_is_hard_cut() {
        let chunks = prepare_chunks("abcdefghijkl", 5);
        assert_eq!(chunks, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn multibyte_text_is_counted_in_chars() {
        let text = "ééééé ééééé ééééé";
        let chunks = prepare_chunks(text, 11);
        assert_eq!(chunks, vec!["ééééé ééééé", "ééééé"]);
    }

    #[test]
    fn every_chunk_respects_the_limit() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
                    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\n\n\
                    Ut enim ad minim veniam; quis nostrud exercitation ullamco.";
        for max in [10, 25, 100] {
            for chunk in prepare_chunks(text, max) {
                assert!(chunk.chars().count() <= max, "{chunk:?} > {max}");
            }
        }
    }
}
