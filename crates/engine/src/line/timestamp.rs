use chrono::NaiveDateTime;

/// Output form of every normalized timestamp; lexicographic order is time order.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Formats tried when a dialect declares none.
pub const DEFAULT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Normalize a captured timestamp to [`CANONICAL_FORMAT`].
///
/// The first format that parses wins. Text that matches no format is kept
/// verbatim (trimmed) rather than dropped.
pub fn normalize<S: AsRef<str>>(raw: &str, formats: &[S]) -> String {
    let trimmed = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt.as_ref()).ok())
        .map(|dt| dt.format(CANONICAL_FORMAT).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logback_timestamp() {
        assert_eq!(
            normalize("2025-11-21 14:05:41.897", DEFAULT_FORMATS),
            "2025-11-21T14:05:41.897"
        );
    }

    #[test]
    fn test_missing_millis_padded() {
        assert_eq!(
            normalize("2025-11-21 14:05:41", DEFAULT_FORMATS),
            "2025-11-21T14:05:41.000"
        );
    }

    #[test]
    fn test_iso_input() {
        assert_eq!(
            normalize("2026-01-06T15:40:57.901", DEFAULT_FORMATS),
            "2026-01-06T15:40:57.901"
        );
    }

    #[test]
    fn test_unparseable_kept_verbatim() {
        assert_eq!(normalize(" Jan 6 15:40 ", DEFAULT_FORMATS), "Jan 6 15:40");
    }

    #[test]
    fn test_custom_format() {
        let formats = vec!["%d/%m/%Y %H:%M:%S".to_string()];
        assert_eq!(normalize("06/01/2026 15:40:57", &formats), "2026-01-06T15:40:57.000");
    }
}
