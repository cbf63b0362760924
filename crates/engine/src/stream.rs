//! Per-worker deinterleaving.
//!
//! Concurrent workers append to the same file, so consecutive physical lines
//! may belong to unrelated events. Every classified line is moved into exactly
//! one worker stream (or counted as discarded) before any order-sensitive
//! parsing happens.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::line::{LineKind, LogLine};

/// Worker id given to lines that carry none.
pub const UNKNOWN_WORKER: &str = "(unknown)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnattributedPolicy {
    /// Collect into a synthetic `(unknown)` stream
    #[default]
    Unknown,
    /// Attach to the stream of the most recent line that had a worker id
    FollowPrevious,
    /// Drop and count
    Discard,
}

/// One worker's lines in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStream {
    pub worker_id: String,
    pub lines: Vec<LogLine>,
}

#[derive(Debug, Default)]
pub struct Deinterleaved {
    /// Streams in first-appearance order of their worker
    pub streams: Vec<WorkerStream>,
    pub discarded: usize,
}

impl Deinterleaved {
    pub fn total_lines(&self) -> usize {
        self.streams.iter().map(|s| s.lines.len()).sum()
    }
}

pub struct ThreadDeinterleaver {
    policy: UnattributedPolicy,
}

impl ThreadDeinterleaver {
    pub fn new(policy: UnattributedPolicy) -> Self {
        Self { policy }
    }

    /// Partition `lines` by worker id.
    ///
    /// `streams` total plus `discarded` always equals the input length, and
    /// order inside each stream is input order. [`LineKind::Filtered`] lines
    /// are always discarded. Blank and separator lines stay with the most
    /// recent attributed line under every policy, so a shape can end on a
    /// separator; before any attributed line they follow the policy.
    pub fn group(&self, lines: Vec<LogLine>) -> Deinterleaved {
        let mut out = Deinterleaved::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut previous: Option<usize> = None;

        for line in lines {
            if line.kind == LineKind::Filtered {
                out.discarded += 1;
                continue;
            }

            let slot = match (line.worker_id.as_deref(), previous) {
                (Some(worker), _) => {
                    let slot = stream_slot(&mut out.streams, &mut index, worker);
                    previous = Some(slot);
                    slot
                }
                (None, Some(slot)) if is_structural(line.kind) => slot,
                (None, previous) => match (self.policy, previous) {
                    (UnattributedPolicy::Discard, _) => {
                        out.discarded += 1;
                        continue;
                    }
                    (UnattributedPolicy::FollowPrevious, Some(slot)) => slot,
                    _ => stream_slot(&mut out.streams, &mut index, UNKNOWN_WORKER),
                },
            };

            out.streams[slot].lines.push(line);
        }

        debug!(
            streams = out.streams.len(),
            discarded = out.discarded,
            policy = ?self.policy,
            "deinterleave: grouped lines by worker"
        );
        out
    }
}

fn is_structural(kind: LineKind) -> bool {
    matches!(kind, LineKind::Blank | LineKind::Separator)
}

fn stream_slot(streams: &mut Vec<WorkerStream>, index: &mut HashMap<String, usize>, worker: &str) -> usize {
    if let Some(&slot) = index.get(worker) {
        return slot;
    }
    streams.push(WorkerStream {
        worker_id: worker.to_string(),
        lines: Vec::new(),
    });
    index.insert(worker.to_string(), streams.len() - 1);
    streams.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, worker: Option<&str>, kind: LineKind) -> LogLine {
        LogLine {
            line_number: n,
            raw: format!("line {n}"),
            kind,
            timestamp: None,
            worker_id: worker.map(str::to_string),
            level: None,
            logger: None,
            message: format!("msg {n}"),
        }
    }

    fn numbers(stream: &WorkerStream) -> Vec<usize> {
        stream.lines.iter().map(|l| l.line_number).collect()
    }

    fn interleaved() -> Vec<LogLine> {
        vec![
            line(1, Some("A"), LineKind::Prefixed),
            line(2, Some("B"), LineKind::Prefixed),
            line(3, None, LineKind::Continuation),
            line(4, Some("A"), LineKind::Prefixed),
            line(5, None, LineKind::Blank),
            line(6, Some("B"), LineKind::Prefixed),
            line(7, Some("C"), LineKind::Filtered),
        ]
    }

    #[test]
    fn test_partition_preserves_order() {
        let out = ThreadDeinterleaver::new(UnattributedPolicy::Unknown).group(interleaved());

        assert_eq!(out.streams.len(), 3);
        assert_eq!(out.streams[0].worker_id, "A");
        assert_eq!(numbers(&out.streams[0]), vec![1, 4, 5]);
        assert_eq!(out.streams[1].worker_id, "B");
        assert_eq!(numbers(&out.streams[1]), vec![2, 6]);
        assert_eq!(out.streams[2].worker_id, UNKNOWN_WORKER);
        assert_eq!(numbers(&out.streams[2]), vec![3]);
        assert_eq!(out.discarded, 1);
    }

    #[test]
    fn test_partition_is_complete_for_every_policy() {
        for policy in [
            UnattributedPolicy::Unknown,
            UnattributedPolicy::FollowPrevious,
            UnattributedPolicy::Discard,
        ] {
            let input = interleaved();
            let total = input.len();
            let out = ThreadDeinterleaver::new(policy).group(input);

            assert_eq!(out.total_lines() + out.discarded, total, "policy {policy:?}");

            let mut seen: Vec<usize> = out.streams.iter().flat_map(numbers).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), out.total_lines(), "duplicated line under {policy:?}");
        }
    }

    #[test]
    fn test_follow_previous_attaches_continuations() {
        let out = ThreadDeinterleaver::new(UnattributedPolicy::FollowPrevious).group(interleaved());

        assert_eq!(out.streams.len(), 2);
        assert_eq!(numbers(&out.streams[0]), vec![1, 4, 5]);
        assert_eq!(numbers(&out.streams[1]), vec![2, 3, 6]);
    }

    #[test]
    fn test_follow_previous_without_prior_worker() {
        let input = vec![line(1, None, LineKind::Continuation), line(2, Some("A"), LineKind::Prefixed)];
        let out = ThreadDeinterleaver::new(UnattributedPolicy::FollowPrevious).group(input);

        assert_eq!(out.streams[0].worker_id, UNKNOWN_WORKER);
        assert_eq!(out.streams[1].worker_id, "A");
    }

    #[test]
    fn test_discard_policy() {
        let out = ThreadDeinterleaver::new(UnattributedPolicy::Discard).group(interleaved());

        assert_eq!(out.streams.len(), 2);
        assert_eq!(numbers(&out.streams[0]), vec![1, 4, 5]);
        assert_eq!(out.discarded, 2);
    }

    #[test]
    fn test_separator_stays_with_previous_worker() {
        let input = vec![
            line(1, Some("A"), LineKind::Prefixed),
            line(2, Some("B"), LineKind::Prefixed),
            line(3, None, LineKind::Separator),
            line(4, None, LineKind::Continuation),
        ];
        let out = ThreadDeinterleaver::new(UnattributedPolicy::Unknown).group(input);

        assert_eq!(numbers(&out.streams[1]), vec![2, 3]);
        assert_eq!(out.streams[2].worker_id, UNKNOWN_WORKER);
        assert_eq!(numbers(&out.streams[2]), vec![4]);
    }

    #[test]
    fn test_leading_blank_follows_policy() {
        let input = vec![line(1, None, LineKind::Blank), line(2, Some("A"), LineKind::Prefixed)];
        let out = ThreadDeinterleaver::new(UnattributedPolicy::Discard).group(input);

        assert_eq!(out.discarded, 1);
        assert_eq!(numbers(&out.streams[0]), vec![2]);
    }

    #[test]
    fn test_empty_input() {
        let out = ThreadDeinterleaver::new(UnattributedPolicy::Unknown).group(Vec::new());
        assert!(out.streams.is_empty());
        assert_eq!(out.discarded, 0);
    }
}
