use thiserror::Error;
use tracing::trace;

use super::shape::{BlockShape, CaptureError, PayloadMode, ShapeKind};
use crate::line::{LineKind, LogLine};
use crate::payload::embedded::{self, EmbeddedError};
use crate::record::{FieldValue, Record};
use crate::stream::WorkerStream;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IncompleteReason {
    #[error("stream ended after {available} of {expected} block lines")]
    Truncated { expected: usize, available: usize },
    #[error("block line {position} did not match")]
    Mismatch { position: usize },
    #[error("field '{field}' on block line {position}: '{value}' is not a valid {kind}")]
    Conversion {
        position: usize,
        field: String,
        value: String,
        kind: &'static str,
    },
    #[error("required field '{field}' missing on block line {position}")]
    MissingField { position: usize, field: String },
    #[error("payload: {0}")]
    Payload(EmbeddedError),
    #[error("no statement text followed the header")]
    MissingStatement,
}

/// A header that matched but did not produce a record.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("incomplete '{shape}' block at line {line_number} (worker {worker_id}): {reason}")]
pub struct IncompleteBlock {
    pub worker_id: String,
    /// Physical line number of the header
    pub line_number: usize,
    pub shape: String,
    pub reason: IncompleteReason,
}

#[derive(Debug, Default)]
pub struct StreamParse {
    pub records: Vec<Record>,
    pub incomplete: Vec<IncompleteBlock>,
    /// Lines whose message matched the header pattern
    pub headers: usize,
}

enum BlockAction {
    /// Emit a record and move past every consumed line
    Emit(Record, usize),
    /// Tally the failure and move one line forward
    Reject(IncompleteReason),
    /// Not a header
    Skip,
}

/// Recognizes records of one shape inside one worker stream.
///
/// The cursor only moves forward and never looks behind the header or past
/// the end of the stream. Blank lines between block lines are skipped;
/// separators are not, so a pattern may use one as a footer. A block either
/// yields a whole record or nothing:
/// any missing, mismatched or unconvertible sub-line rejects it and parsing
/// resumes at the line after the header.
pub struct BlockParser;

impl BlockParser {
    pub fn parse_stream(stream: &WorkerStream, shape: &BlockShape) -> StreamParse {
        let lines = &stream.lines;
        let mut out = StreamParse::default();
        let mut i = 0;

        while i < lines.len() {
            match Self::step(stream, shape, i, &mut out.headers) {
                BlockAction::Emit(record, consumed) => {
                    out.records.push(record);
                    i += consumed;
                }
                BlockAction::Reject(reason) => {
                    trace!(
                        worker = %stream.worker_id,
                        shape = %shape.name,
                        line = lines[i].line_number,
                        %reason,
                        "block: incomplete"
                    );
                    out.incomplete.push(IncompleteBlock {
                        worker_id: stream.worker_id.clone(),
                        line_number: lines[i].line_number,
                        shape: shape.name.clone(),
                        reason,
                    });
                    i += 1;
                }
                BlockAction::Skip => i += 1,
            }
        }

        out
    }

    fn step(stream: &WorkerStream, shape: &BlockShape, i: usize, headers: &mut usize) -> BlockAction {
        let lines = &stream.lines;
        let head = &lines[i];
        if !head.kind.carries_message() {
            return BlockAction::Skip;
        }

        let Some(captured) = shape.header().capture(&head.message) else {
            return BlockAction::Skip;
        };
        *headers += 1;

        let mut fields = match captured {
            Ok(fields) => fields,
            Err(e) => return BlockAction::Reject(capture_reason(0, e)),
        };

        let payload = match shape.payload {
            PayloadMode::None => None,
            PayloadMode::EmbeddedJson => match embedded::extract_object(&head.message) {
                Ok(value) => Some(value),
                Err(e) => return BlockAction::Reject(IncompleteReason::Payload(e)),
            },
        };

        let consumed = match &shape.kind {
            ShapeKind::Block => {
                let expected = shape.lines().len();
                let mut cursor = i + 1;
                for (offset, pattern) in shape.lines().iter().enumerate() {
                    let position = offset + 1;
                    while lines.get(cursor).is_some_and(|l| l.kind == LineKind::Blank) {
                        cursor += 1;
                    }
                    let Some(line) = lines.get(cursor) else {
                        return BlockAction::Reject(IncompleteReason::Truncated {
                            expected,
                            available: offset,
                        });
                    };
                    match pattern.capture(&line.message) {
                        Some(Ok(more)) => fields.extend(more),
                        Some(Err(e)) => return BlockAction::Reject(capture_reason(position, e)),
                        None => return BlockAction::Reject(IncompleteReason::Mismatch { position }),
                    }
                    cursor += 1;
                }
                cursor - i
            }
            ShapeKind::Paired(spec) => {
                if spec.wants_statement(&fields) {
                    let (collected, next) = spec.collect(lines, i + 1);
                    if collected.is_empty() {
                        return BlockAction::Reject(IncompleteReason::MissingStatement);
                    }
                    let texts: Vec<&str> = collected.iter().map(|l| l.message.as_str()).collect();
                    fields.extend(spec.statement_fields(&texts));
                    next - i
                } else {
                    1
                }
            }
        };

        BlockAction::Emit(build_record(stream, shape, head, fields, payload), consumed)
    }
}

fn build_record(
    stream: &WorkerStream,
    shape: &BlockShape,
    head: &LogLine,
    fields: Vec<(String, FieldValue)>,
    payload: Option<serde_json::Value>,
) -> Record {
    Record {
        shape: shape.name.clone(),
        worker_id: stream.worker_id.clone(),
        line_number: head.line_number,
        timestamp: head.timestamp.clone(),
        level: head.level.clone(),
        logger: head.logger.clone(),
        raw_header: head.raw.clone(),
        fields,
        payload,
    }
}

fn capture_reason(position: usize, error: CaptureError) -> IncompleteReason {
    match error {
        CaptureError::Missing { field } => IncompleteReason::MissingField { position, field },
        CaptureError::Conversion { field, value, kind } => IncompleteReason::Conversion {
            position,
            field,
            value,
            kind: kind.as_str(),
        },
    }
}
