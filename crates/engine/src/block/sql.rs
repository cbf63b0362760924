use std::borrow::Cow;

use md5::{Digest, Md5};
use regex::{Captures, Regex, RegexBuilder};

/// Digits of an Oracle `SQL_ID`, least significant last.
const SQL_ID_ALPHABET: &[u8; 32] = b"0123456789abcdfghjkmnpqrstuvwxyz";
const SQL_ID_LEN: usize = 13;

/// Derived facts about one captured SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSummary {
    pub sql_type: &'static str,
    pub table_name: String,
    pub parameter_count: usize,
    pub in_clause_count: usize,
    pub parameter_values: Vec<String>,
    /// Oracle `SQL_ID` of the executed text, IN-list literals rebound
    pub sql_id: String,
}

/// Lightweight, keyword-level SQL inspection. Not a parser.
#[derive(Debug, Clone)]
pub struct SqlAnalyzer {
    table_patterns: Vec<Regex>,
    in_clause: Regex,
    literal: Regex,
    in_list: Regex,
    quoted: Regex,
}

impl SqlAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        let table_patterns = [
            r"\bFROM\s+([A-Z_][A-Z0-9_]*)",
            r"\bINSERT\s+INTO\s+([A-Z_][A-Z0-9_]*)",
            r"\bUPDATE\s+([A-Z_][A-Z0-9_]*)",
            r"\bDELETE\s+FROM\s+([A-Z_][A-Z0-9_]*)",
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            table_patterns,
            in_clause: RegexBuilder::new(r"\bIN\s*\(([^)]+)\)")
                .case_insensitive(true)
                .build()?,
            literal: Regex::new(r"=\s*'([^']*)'|=\s*(\d+(?:\.\d+)?)")?,
            in_list: RegexBuilder::new(r"(\bin\s*\()([^)]+)(\))")
                .case_insensitive(true)
                .build()?,
            quoted: Regex::new(r"'(?:[^']|'')*'")?,
        })
    }

    pub fn statement_type(sql: &str) -> &'static str {
        const KEYWORDS: &[(&str, &str)] = &[
            ("SELECT", "SELECT"),
            ("INSERT", "INSERT"),
            ("UPDATE", "UPDATE"),
            ("DELETE", "DELETE"),
            ("MERGE", "MERGE"),
            ("CREATE", "DDL"),
            ("ALTER", "DDL"),
            ("DROP", "DDL"),
        ];

        let upper = sql.trim().to_ascii_uppercase();
        KEYWORDS
            .iter()
            .find(|(kw, _)| upper.starts_with(kw))
            .map(|(_, kind)| *kind)
            .unwrap_or("OTHER")
    }

    /// Primary table, upper-cased; empty when none is recognized.
    pub fn table_name(&self, sql: &str) -> String {
        let upper = sql.trim().to_ascii_uppercase();
        self.table_patterns
            .iter()
            .find_map(|re| re.captures(&upper))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// Values inside the first `IN (...)` list, quotes removed.
    pub fn in_clause_values(&self, sql: &str) -> Vec<String> {
        self.in_clause
            .captures(sql)
            .and_then(|caps| caps.get(1))
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|v| v.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Literal values bound to `= ?` placeholders, read back from the executed text.
    pub fn bound_values(&self, prepared: &str, executed: &str) -> Vec<String> {
        if prepared.is_empty() || executed.is_empty() || !prepared.contains('?') {
            return Vec::new();
        }
        let in_values = self.in_clause_values(executed);
        if !in_values.is_empty() {
            return in_values;
        }
        self.literal
            .captures_iter(executed)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Statement text as the database caches it: trailing `;` dropped and
    /// every IN list of quoted literals rewritten to `(:1 ,:2 ,... ,:N )`.
    pub fn cached_text<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        let trimmed = sql.trim().trim_end_matches(';').trim_end();
        self.in_list.replace_all(trimmed, |caps: &Captures<'_>| {
            let literals = self.quoted.find_iter(&caps[2]).count();
            if literals == 0 {
                return caps[0].to_string();
            }
            let binds: Vec<String> = (1..=literals).map(|i| format!(":{i}")).collect();
            format!("{}{} {}", &caps[1], binds.join(" ,"), &caps[3])
        })
    }

    /// `SQL_ID` the database would assign to `sql`; empty for empty text.
    pub fn sql_id(&self, sql: &str) -> String {
        let text = self.cached_text(sql);
        if text.is_empty() {
            return String::new();
        }
        oracle_sql_id(&text)
    }

    pub fn analyze(&self, prepared: &str, executed: &str) -> SqlSummary {
        let subject = if prepared.is_empty() { executed } else { prepared };
        let in_values = self.in_clause_values(executed);
        let in_clause_count = in_values.len();
        let parameter_values = if in_values.is_empty() {
            self.bound_values(prepared, executed)
        } else {
            in_values
        };

        SqlSummary {
            sql_type: Self::statement_type(subject),
            table_name: self.table_name(subject),
            parameter_count: prepared.matches('?').count(),
            in_clause_count,
            parameter_values,
            sql_id: self.sql_id(if executed.is_empty() { prepared } else { executed }),
        }
    }
}

/// 64-bit statement hash: the last two little-endian words of
/// MD5(text + NUL).
fn oracle_hash(text: &str) -> u64 {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    let digest = hasher.finalize();

    let word = |at: usize| u32::from_le_bytes([digest[at], digest[at + 1], digest[at + 2], digest[at + 3]]);
    (u64::from(word(8)) << 32) | u64::from(word(12))
}

/// Oracle `SQL_ID` of the exact text (no normalization).
pub fn oracle_sql_id(text: &str) -> String {
    let mut hash = oracle_hash(text);
    let mut digits = [0u8; SQL_ID_LEN];
    for digit in digits.iter_mut().rev() {
        *digit = SQL_ID_ALPHABET[(hash % 32) as usize];
        hash /= 32;
    }
    digits.iter().map(|&b| char::from(b)).collect()
}

/// Oracle `HASH_VALUE`: the low word of the statement hash.
pub fn oracle_hash_value(text: &str) -> u32 {
    (oracle_hash(text) & 0xFFFF_FFFF) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SqlAnalyzer {
        SqlAnalyzer::new().expect("static SQL patterns compile")
    }

    #[test]
    fn test_statement_type() {
        assert_eq!(SqlAnalyzer::statement_type("  select * from t"), "SELECT");
        assert_eq!(SqlAnalyzer::statement_type("merge into t"), "MERGE");
        assert_eq!(SqlAnalyzer::statement_type("alter table t add c int"), "DDL");
        assert_eq!(SqlAnalyzer::statement_type("commit"), "OTHER");
    }

    #[test]
    fn test_table_name() {
        let a = analyzer();
        assert_eq!(a.table_name("select id from property_charter where x=?"), "PROPERTY_CHARTER");
        assert_eq!(a.table_name("insert into audit_log values (?)"), "AUDIT_LOG");
        assert_eq!(a.table_name("update users set a=1"), "USERS");
        assert_eq!(a.table_name("commit"), "");
    }

    #[test]
    fn test_in_clause_values() {
        let a = analyzer();
        assert_eq!(
            a.in_clause_values("select * from t where gu in ('강남구', \"서초구\", 3)"),
            vec!["강남구", "서초구", "3"]
        );
        assert!(a.in_clause_values("select 1 from dual").is_empty());
    }

    #[test]
    fn test_bound_values_from_literals() {
        let a = analyzer();
        assert_eq!(
            a.bound_values("select * from t where id=? and name=?", "select * from t where id=42 and name='kim'"),
            vec!["42", "kim"]
        );
        assert!(a.bound_values("select * from t", "select * from t").is_empty());
    }

    #[test]
    fn test_analyze_prepared_and_executed() {
        let a = analyzer();
        let s = a.analyze(
            "select * from property where district_id in (?, ?)",
            "select * from property where district_id in (11, 12)",
        );
        assert_eq!(s.sql_type, "SELECT");
        assert_eq!(s.table_name, "PROPERTY");
        assert_eq!(s.parameter_count, 2);
        assert_eq!(s.in_clause_count, 2);
        assert_eq!(s.parameter_values, vec!["11", "12"]);
        assert_eq!(s.sql_id, oracle_sql_id("select * from property where district_id in (11, 12)"));
    }

    // ── SQL_ID ───────────────────────────────────────────────────

    #[test]
    fn test_sql_id_known_values() {
        assert_eq!(oracle_sql_id("select * from dual"), "a5ks9fhw2v9s1");
        assert_eq!(oracle_hash_value("select * from dual"), 942_515_969);
    }

    #[test]
    fn test_quoted_in_list_is_rebound() {
        let a = analyzer();
        let sql = "select * from t where id in ('a','b','c');";
        assert_eq!(a.cached_text(sql), "select * from t where id in (:1 ,:2 ,:3 )");
        assert_eq!(a.sql_id(sql), "9bq5n4mhngxf3");
        assert_eq!(oracle_hash_value("select * from t where id in (:1 ,:2 ,:3 )"), 3_779_589_571);
    }

    #[test]
    fn test_numeric_in_list_and_plain_text_kept() {
        let a = analyzer();
        assert_eq!(a.cached_text("select 1 from t where id in (1, 2)"), "select 1 from t where id in (1, 2)");
        assert_eq!(a.cached_text("  select * from dual ;  "), "select * from dual");
        assert_eq!(a.sql_id("select * from dual;"), "a5ks9fhw2v9s1");
        assert_eq!(a.sql_id("  "), "");
    }
}
