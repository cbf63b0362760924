//! Compile: turns a validated [`DialectConfig`] into matchers.

use regex::Regex;
use tracing::debug;

use super::model::{DialectConfig, ShapeConfig, ShapeKindConfig};
use crate::block::paired::PairedSpec;
use crate::block::{BlockShape, ShapeKind};
use crate::error::EngineError;
use crate::line::classify::ClassifyOptions;
use crate::line::sniff::MarkerSniffer;
use crate::line::LineClassifier;

/// A dialect whose patterns have all been compiled.
///
/// Holds no per-run state; every run asks for its own [`LineClassifier`].
#[derive(Debug, Clone)]
pub struct Dialect {
    config: DialectConfig,
    prefixes: Vec<Regex>,
    shapes: Vec<BlockShape>,
}

impl Dialect {
    pub fn compile(config: DialectConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;

        let prefixes = config
            .prefixes
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                let owner = format!("{} prefix #{}", config.name, i + 1);
                let re = compile_pattern(&owner, pattern)?;
                if !re.capture_names().flatten().any(|n| n == "message") {
                    return Err(EngineError::Config(format!("{owner} has no 'message' group")));
                }
                Ok(re)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let shapes = config
            .shapes
            .iter()
            .map(compile_shape)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(marker) = &config.marker {
            MarkerSniffer::new(marker, config.marker_case_sensitive)
                .map_err(|e| EngineError::Config(e.to_string()))?;
        }

        debug!(
            dialect = %config.name,
            prefixes = prefixes.len(),
            shapes = shapes.len(),
            "dialect: compiled"
        );

        Ok(Self {
            config,
            prefixes,
            shapes,
        })
    }

    /// Load by built-in name or file path, then compile.
    pub fn load(name_or_path: &str) -> Result<Self, EngineError> {
        Self::compile(DialectConfig::resolve(name_or_path)?)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    pub fn shapes(&self) -> &[BlockShape] {
        &self.shapes
    }

    /// A fresh classifier with zeroed marker counters.
    pub fn classifier(&self) -> Result<LineClassifier, EngineError> {
        let sniffer = self
            .config
            .marker
            .as_deref()
            .map(|m| MarkerSniffer::new(m, self.config.marker_case_sensitive))
            .transpose()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let options = ClassifyOptions {
            prefilter: self.config.prefilter,
            tolerate_unparsed: self.config.tolerate_unparsed,
            continuation_lines: self.config.continuation_lines,
            timestamp_formats: self.config.timestamp_formats.clone(),
        };
        Ok(LineClassifier::new(self.prefixes.clone(), sniffer, options))
    }
}

fn compile_pattern(owner: &str, pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|source| EngineError::InvalidPattern {
        owner: owner.to_string(),
        source,
    })
}

fn compile_shape(shape: &ShapeConfig) -> Result<BlockShape, EngineError> {
    let header = compile_pattern(&format!("shape '{}' header", shape.name), &shape.header)?;
    let lines = shape
        .lines
        .iter()
        .enumerate()
        .map(|(i, p)| compile_pattern(&format!("shape '{}' line {}", shape.name, i + 1), p))
        .collect::<Result<Vec<_>, _>>()?;

    let kind = match shape.kind {
        ShapeKindConfig::Block => ShapeKind::Block,
        ShapeKindConfig::Paired => {
            let collect_if = shape
                .collect_if
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            ShapeKind::Paired(PairedSpec::new(shape.max_lines, collect_if).map_err(EngineError::Config)?)
        }
    };

    BlockShape::new(&shape.name, kind, header, lines, &shape.fields, shape.payload)
        .map_err(EngineError::Config)
}
