//! Dialects shipped inside the binary.

const BUILTINS: &[(&str, &str)] = &[
    ("bottleneck", include_str!("../../dialects/bottleneck.toml")),
    ("hikaricp", include_str!("../../dialects/hikaricp.toml")),
    ("p6spy", include_str!("../../dialects/p6spy.toml")),
    ("perf-ndjson", include_str!("../../dialects/perf-ndjson.toml")),
    ("perf-chunks", include_str!("../../dialects/perf-chunks.toml")),
    ("task1-v1", include_str!("../../dialects/task1-v1.toml")),
    ("v2-cache", include_str!("../../dialects/v2-cache.toml")),
    ("rtt-phase2", include_str!("../../dialects/rtt-phase2.toml")),
];

/// Names of the built-in dialects, in listing order.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

/// TOML source of a built-in dialect.
pub fn source(name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, toml)| *toml)
}
