//! Public `SVL-###` identifiers derived from internal row ids.

const PREFIX: &str = "SVL-";

/// Formats a row id as a Talent ID, zero-padded to three digits.
pub fn format_talent_id(id: i64) -> String {
    format!("{PREFIX}{id:03}")
}

/// Parses a Talent ID back into the row id.
///
/// The prefix is case-insensitive and surrounding whitespace is ignored.
/// Returns `None` for anything that could not have come from `format_talent_id`.
pub fn parse_talent_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let prefix = raw.get(..PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(PREFIX) {
        return None;
    }
    let digits = &raw[PREFIX.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(format_talent_id(7), "SVL-007");
        assert_eq!(format_talent_id(42), "SVL-042");
        assert_eq!(format_talent_id(100), "SVL-100");
    }

    #[test]
    fn test_format_wide_ids_unpadded() {
        assert_eq!(format_talent_id(1234), "SVL-1234");
    }

    #[test]
    fn test_parse_accepts_formatted_ids() {
        assert_eq!(parse_talent_id("SVL-007"), Some(7));
        assert_eq!(parse_talent_id("SVL-1234"), Some(1234));
    }

    #[test]
    fn test_parse_is_lenient_on_case_and_padding() {
        assert_eq!(parse_talent_id("svl-7"), Some(7));
        assert_eq!(parse_talent_id("  Svl-012 "), Some(12));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_talent_id("007"), None);
        assert_eq!(parse_talent_id("SVL-"), None);
        assert_eq!(parse_talent_id("SVL-abc"), None);
        assert_eq!(parse_talent_id("SVL--5"), None);
        assert_eq!(parse_talent_id("SVL-+5"), None);
        assert_eq!(parse_talent_id("SVL-000"), None);
        assert_eq!(parse_talent_id("SVL-99999999999999999999"), None);
        assert_eq!(parse_talent_id("ABC-001"), None);
        assert_eq!(parse_talent_id("SV"), None);
    }
}
