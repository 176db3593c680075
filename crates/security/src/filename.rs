//! Filename sanitization for declared attachment names.
//!
//! Strips path-traversal and reserved characters by substitution and caps
//! the final length at 255 characters, truncating the stem rather than the
//! extension.

/// Maximum sanitized filename length in characters.
const MAX_FILENAME_CHARS: usize = 255;

/// Sequences substituted with `_`, traversal first.
const DANGEROUS: &[&str] = &["/", "\\", "..", "<", ">", ":", "\"", "|", "?", "*"];

/// Sanitize a caller-declared filename.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = name.to_string();
    for pattern in DANGEROUS {
        sanitized = sanitized.replace(pattern, "_");
    }

    if sanitized.chars().count() <= MAX_FILENAME_CHARS {
        return sanitized;
    }

    // Over-long: keep the trailing extension segment, truncate the stem.
    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => {
            let budget = MAX_FILENAME_CHARS.saturating_sub(ext.chars().count() + 1);
            let stem: String = stem.chars().take(budget).collect();
            format!("{stem}.{ext}")
        }
        _ => sanitized.chars().take(MAX_FILENAME_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_traversal_stripped() {
        let out = sanitize_filename("../../etc/passwd");
        assert!(!out.contains('/'));
        assert!(!out.contains('\\'));
        assert!(!out.contains(".."));
    }

    #[test]
    fn windows_reserved_chars_stripped() {
        let out = sanitize_filename(r#"re<po>rt:"q1"|draft?*.pdf"#);
        for ch in ['<', '>', ':', '"', '|', '?', '*', '\\'] {
            assert!(!out.contains(ch), "found {ch:?} in {out}");
        }
        assert!(out.ends_with(".pdf"));
    }

    #[test]
    fn clean_name_unchanged() {
        assert_eq!(sanitize_filename("q3-report.pdf"), "q3-report.pdf");
    }

    #[test]
    fn long_name_truncated_preserving_extension() {
        let name = format!("{}.pdf", "a".repeat(300));
        let out = sanitize_filename(&name);
        assert!(out.chars().count() <= 255);
        assert!(out.ends_with(".pdf"));
    }

    #[test]
    fn long_name_without_extension_truncated() {
        let out = sanitize_filename(&"b".repeat(400));
        assert_eq!(out.chars().count(), 255);
    }

    #[test]
    fn multibyte_names_never_split_mid_char() {
        let name = format!("{}.pdf", "é".repeat(300));
        let out = sanitize_filename(&name);
        assert!(out.chars().count() <= 255);
        assert!(out.ends_with(".pdf"));
    }
}
