//! Output file naming: `<prefix>_<input stem>_<YYYYmmdd_HHMMSS>`.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

const FALLBACK_STEM: &str = "analysis";

/// Input file stem with a leading `<digits>_` run-number removed.
pub fn clean_stem(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let digits = stem.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && stem[digits..].starts_with('_') {
        stem[digits + 1..].to_string()
    } else {
        stem
    }
}

pub fn output_stem(prefix: &str, input: &Path, at: NaiveDateTime) -> String {
    let stem = clean_stem(input);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem.as_str() };
    format!("{prefix}_{stem}_{}", at.format("%Y%m%d_%H%M%S"))
}

/// Path of one output file inside `dir`.
pub fn output_path(dir: &Path, stem: &str, table: Option<&str>, extension: &str) -> PathBuf {
    match table {
        Some(table) => dir.join(format!("{stem}_{table}.{extension}")),
        None => dir.join(format!("{stem}.{extension}")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 6)
            .and_then(|d| d.and_hms_opt(15, 40, 57))
            .expect("valid date")
    }

    #[test]
    fn test_clean_stem() {
        assert_eq!(clean_stem(Path::new("logs/01_wherehouse.log")), "wherehouse");
        assert_eq!(clean_stem(Path::new("wherehouse.log")), "wherehouse");
        assert_eq!(clean_stem(Path::new("2024.log")), "2024");
        assert_eq!(clean_stem(Path::new("3_")), "");
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(
            output_stem("p6spy", Path::new("/tmp/3_run.log"), at()),
            "p6spy_run_20260106_154057"
        );
        assert_eq!(output_stem("p6spy", Path::new("/tmp/12_.log"), at()), "p6spy_analysis_20260106_154057");
    }

    #[test]
    fn test_output_path() {
        let dir = Path::new("out");
        assert_eq!(output_path(dir, "s", Some("metrics"), "csv"), PathBuf::from("out/s_metrics.csv"));
        assert_eq!(output_path(dir, "s", None, "json"), PathBuf::from("out/s.json"));
    }
}
