//! Small text helpers shared by the HTTP clients.

/// Truncates to at most `max_bytes`, backing off to a char boundary so
/// multi-byte content never splits mid-character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_passes_through() {
        assert_eq!(truncate_utf8("hello", 500), "hello");
        assert_eq!(truncate_utf8("", 10), "");
    }

    #[test]
    fn ascii_cuts_at_the_limit() {
        let s = "x".repeat(600);
        assert_eq!(truncate_utf8(&s, 500).len(), 500);
    }

    #[test]
    fn korean_body_cuts_on_char_boundary() {
        // 200 three-byte characters; byte 500 falls mid-character.
        let body = "한".repeat(200);
        let cut = truncate_utf8(&body, 500);
        assert_eq!(cut.len(), 498);
        assert!(body.starts_with(cut));
    }

    #[test]
    fn exact_boundary_is_kept() {
        let body = "한".repeat(200);
        assert_eq!(truncate_utf8(&body, 600).len(), 600);
    }
}
