use std::collections::{BTreeMap, HashSet};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::paired::{PairedSpec, DERIVED_FIELDS};
use crate::record::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Int,
    Float,
    #[default]
    Text,
    Bool,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Bool => "bool",
        }
    }

    /// Convert captured text; `None` when the text is not a valid value of this kind.
    pub fn convert(&self, text: &str) -> Option<FieldValue> {
        let text = text.trim();
        match self {
            FieldKind::Int => text.parse().ok().map(FieldValue::Int),
            FieldKind::Float => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            FieldKind::Text => Some(FieldValue::Text(text.to_string())),
            FieldKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Some(FieldValue::Bool(true)),
                "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
        }
    }
}

/// Declared type of a named capture group.
///
/// Accepts either a bare kind (`total_ms = "int"`) or a table
/// (`note = { kind = "text", optional = true }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDecl {
    Kind(FieldKind),
    Detailed {
        kind: FieldKind,
        #[serde(default)]
        optional: bool,
    },
}

impl FieldDecl {
    fn kind(&self) -> FieldKind {
        match self {
            FieldDecl::Kind(kind) | FieldDecl::Detailed { kind, .. } => *kind,
        }
    }

    fn optional(&self) -> bool {
        matches!(self, FieldDecl::Detailed { optional: true, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    #[default]
    None,
    /// The header message carries a JSON object after its first `{`
    EmbeddedJson,
}

#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// Header plus a fixed number of positional sub-lines
    Block,
    /// Header plus up to `max_lines` free text lines
    Paired(PairedSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
}

/// Why a matched line could not produce its fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    Missing { field: String },
    Conversion { field: String, value: String, kind: FieldKind },
}

/// One compiled pattern and the typed fields its named groups produce.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: Regex,
    fields: Vec<FieldSpec>,
}

impl LinePattern {
    fn new(regex: Regex, decls: &BTreeMap<String, FieldDecl>) -> Self {
        let fields = regex
            .capture_names()
            .flatten()
            .map(|name| {
                let decl = decls.get(name);
                FieldSpec {
                    name: name.to_string(),
                    kind: decl.map(FieldDecl::kind).unwrap_or_default(),
                    optional: decl.map(FieldDecl::optional).unwrap_or(false),
                }
            })
            .collect();
        Self { regex, fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// `None` when the pattern does not match at all.
    pub fn capture(&self, text: &str) -> Option<Result<Vec<(String, FieldValue)>, CaptureError>> {
        self.regex.captures(text).map(|caps| self.typed(&caps))
    }

    fn typed(&self, caps: &Captures<'_>) -> Result<Vec<(String, FieldValue)>, CaptureError> {
        let mut out = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let Some(m) = caps.name(&spec.name) else {
                if spec.optional {
                    continue;
                }
                return Err(CaptureError::Missing {
                    field: spec.name.clone(),
                });
            };
            let value = spec.kind.convert(m.as_str()).ok_or_else(|| CaptureError::Conversion {
                field: spec.name.clone(),
                value: m.as_str().to_string(),
                kind: spec.kind,
            })?;
            out.push((spec.name.clone(), value));
        }
        Ok(out)
    }
}

/// A compiled record shape.
#[derive(Debug, Clone)]
pub struct BlockShape {
    pub name: String,
    pub kind: ShapeKind,
    pub payload: PayloadMode,
    header: LinePattern,
    lines: Vec<LinePattern>,
}

impl BlockShape {
    pub fn new(
        name: &str,
        kind: ShapeKind,
        header: Regex,
        lines: Vec<Regex>,
        decls: &BTreeMap<String, FieldDecl>,
        payload: PayloadMode,
    ) -> Result<Self, String> {
        if matches!(kind, ShapeKind::Paired(_)) && !lines.is_empty() {
            return Err(format!("shape '{name}': paired shapes take no positional lines"));
        }

        let header = LinePattern::new(header, decls);
        let lines: Vec<LinePattern> = lines.into_iter().map(|re| LinePattern::new(re, decls)).collect();

        let mut seen = HashSet::new();
        let derived: &[&str] = match kind {
            ShapeKind::Paired(_) => DERIVED_FIELDS,
            ShapeKind::Block => &[],
        };
        let names = std::iter::once(&header)
            .chain(lines.iter())
            .flat_map(|p| p.fields.iter().map(|f| f.name.as_str()))
            .chain(derived.iter().copied());
        for field in names {
            if !seen.insert(field) {
                return Err(format!("shape '{name}': field '{field}' is captured more than once"));
            }
        }

        for declared in decls.keys() {
            if !seen.contains(declared.as_str()) {
                return Err(format!("shape '{name}': declared field '{declared}' is not a capture group"));
            }
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            payload,
            header,
            lines,
        })
    }

    pub fn header(&self) -> &LinePattern {
        &self.header
    }

    /// Positional sub-patterns following the header.
    pub fn lines(&self) -> &[LinePattern] {
        &self.lines
    }

    /// Every field a record of this shape can carry, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::iter::once(&self.header)
            .chain(self.lines.iter())
            .flat_map(|p| p.fields.iter().map(|f| f.name.clone()))
            .collect();
        if let ShapeKind::Paired(_) = self.kind {
            names.extend(DERIVED_FIELDS.iter().map(|s| s.to_string()));
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls(pairs: &[(&str, FieldDecl)]) -> BTreeMap<String, FieldDecl> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_field_kind_convert() {
        assert_eq!(FieldKind::Int.convert(" 42 "), Some(FieldValue::Int(42)));
        assert_eq!(FieldKind::Int.convert("4.2"), None);
        assert_eq!(FieldKind::Float.convert("50"), Some(FieldValue::Float(50.0)));
        assert_eq!(FieldKind::Float.convert("inf"), None);
        assert_eq!(FieldKind::Bool.convert("TRUE"), Some(FieldValue::Bool(true)));
        assert_eq!(FieldKind::Bool.convert("yes"), None);
    }

    #[test]
    fn test_capture_typed_fields() {
        let pattern = LinePattern::new(
            Regex::new(r"RDB: (?P<rdb_ms>\d+)ms \((?P<rdb_pct>[\d.]+)%\)").unwrap(),
            &decls(&[
                ("rdb_ms", FieldDecl::Kind(FieldKind::Int)),
                ("rdb_pct", FieldDecl::Kind(FieldKind::Float)),
            ]),
        );

        let fields = pattern.capture("2. RDB: 50ms (50.0%)").unwrap().unwrap();
        assert_eq!(
            fields,
            vec![
                ("rdb_ms".to_string(), FieldValue::Int(50)),
                ("rdb_pct".to_string(), FieldValue::Float(50.0)),
            ]
        );
        assert!(pattern.capture("unrelated").is_none());
    }

    #[test]
    fn test_conversion_failure() {
        let pattern = LinePattern::new(
            Regex::new(r"calls: (?P<calls>\S+)").unwrap(),
            &decls(&[("calls", FieldDecl::Kind(FieldKind::Int))]),
        );
        assert_eq!(
            pattern.capture("calls: many").unwrap(),
            Err(CaptureError::Conversion {
                field: "calls".to_string(),
                value: "many".to_string(),
                kind: FieldKind::Int,
            })
        );
    }

    #[test]
    fn test_optional_group() {
        let re = Regex::new(r"point: (?P<point>[\d.]+)(?: \((?P<note>[^)]+)\))?").unwrap();
        let optional = LinePattern::new(
            re.clone(),
            &decls(&[("note", FieldDecl::Detailed { kind: FieldKind::Text, optional: true })]),
        );
        let required = LinePattern::new(re, &BTreeMap::new());

        let fields = optional.capture("point: 1.2").unwrap().unwrap();
        assert_eq!(fields, vec![("point".to_string(), FieldValue::Text("1.2".to_string()))]);
        assert_eq!(
            required.capture("point: 1.2").unwrap(),
            Err(CaptureError::Missing { field: "note".to_string() })
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = BlockShape::new(
            "dup",
            ShapeKind::Block,
            Regex::new(r"(?P<x>\d+)").unwrap(),
            vec![Regex::new(r"(?P<x>\d+)").unwrap()],
            &BTreeMap::new(),
            PayloadMode::None,
        )
        .unwrap_err();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn test_undeclared_group_rejected() {
        let err = BlockShape::new(
            "typo",
            ShapeKind::Block,
            Regex::new(r"(?P<total>\d+)").unwrap(),
            vec![],
            &decls(&[("totl", FieldDecl::Kind(FieldKind::Int))]),
            PayloadMode::None,
        )
        .unwrap_err();
        assert!(err.contains("totl"));
    }

    #[test]
    fn test_field_names_in_declaration_order() {
        let shape = BlockShape::new(
            "b",
            ShapeKind::Block,
            Regex::new(r"total (?P<total_ms>\d+)").unwrap(),
            vec![
                Regex::new(r"rdb (?P<rdb_ms>\d+)").unwrap(),
                Regex::new(r"calls (?P<calls>\d+)").unwrap(),
            ],
            &BTreeMap::new(),
            PayloadMode::None,
        )
        .unwrap();
        assert_eq!(shape.field_names(), vec!["total_ms", "rdb_ms", "calls"]);
    }

    #[test]
    fn test_field_decl_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            fields: BTreeMap<String, FieldDecl>,
        }
        let h: Holder = toml::from_str(
            "[fields]\ntotal = \"int\"\nnote = { kind = \"text\", optional = true }\n",
        )
        .unwrap();
        assert_eq!(h.fields["total"], FieldDecl::Kind(FieldKind::Int));
        assert_eq!(
            h.fields["note"],
            FieldDecl::Detailed { kind: FieldKind::Text, optional: true }
        );
    }
}
