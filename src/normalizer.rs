//! Canonical cleanup of recognized text before field extraction.

/// Currency marker that survives normalization.
pub const CURRENCY_SYMBOL: char = '₹';

/// Punctuation kept by [`normalize`].
const ALLOWED_PUNCTUATION: [char; 5] = ['.', ',', '-', '/', ':'];

/// Normalize raw OCR or text-layer output.
///
/// Lowercases, folds every run of whitespace (newlines included) into a single
/// space, drops characters outside the allow-list and trims the ends. Spaces
/// that end up adjacent after a character is dropped are folded as well, so
/// `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !is_allowed(ch) {
            continue;
        }
        if pending_space && !normalized.is_empty() {
            normalized.push(' ');
        }
        pending_space = false;
        normalized.push(ch);
    }

    normalized
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_lowercase()
        || ch.is_ascii_digit()
        || ch == CURRENCY_SYMBOL
        || ALLOWED_PUNCTUATION.contains(&ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(
            normalize("  TAX INVOICE\n\n\nABC   Pvt Ltd\r\n"),
            "tax invoice abc pvt ltd"
        );
    }

    #[test]
    fn test_drops_characters_outside_allow_list() {
        assert_eq!(
            normalize("Total (incl. GST): ₹58,400/- #paid!"),
            "total incl. gst: ₹58,400/- paid"
        );
    }

    #[test]
    fn test_dropped_characters_do_not_leave_double_spaces() {
        assert_eq!(normalize("name @ company"), "name company");
        assert_eq!(normalize("* resume *"), "resume");
    }

    #[test]
    fn test_non_ascii_letters_are_dropped() {
        assert_eq!(normalize("Café Müller"), "caf mller");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            "INVOICE No. 42\nDate: 01/02/2024\n\nTotal ₹58,400",
            "Résumé —  Jane   Doe\tSkills: Python, AI & ML",
            "  ** !! ##  ",
            "a @ b # c",
            "Line one\r\nLine two\u{00a0}with nbsp",
            "İSTANBUL ŞUBESİ",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
