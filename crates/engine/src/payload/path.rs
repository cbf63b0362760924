use serde_json::Value;

/// Resolve a dot-separated path against a nested payload.
///
/// Walks object keys only. A missing key, an empty segment, or a non-object
/// value part-way along the path yields `None`. The payload is borrowed and
/// never modified.
pub fn resolve<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(payload, |current, segment| match current {
            Value::Object(map) if !segment.is_empty() => map.get(segment),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "step": "R-02",
            "resultData": {
                "l1CacheHit": true,
                "l1CacheResult": { "l1CacheGetDurationNs": 1_523_400 },
                "l2CacheResults": [ {"hit": true}, {"hit": false} ]
            }
        })
    }

    #[test]
    fn test_resolve_nested() {
        let p = payload();
        assert_eq!(
            resolve(&p, "resultData.l1CacheResult.l1CacheGetDurationNs").and_then(Value::as_u64),
            Some(1_523_400)
        );
        assert_eq!(resolve(&p, "step"), Some(&json!("R-02")));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let p = payload();
        assert!(resolve(&p, "resultData.l2TotalHits").is_none());
        assert!(resolve(&p, "nothing.at.all").is_none());
    }

    #[test]
    fn test_non_object_midpath_is_absent() {
        let p = payload();
        assert!(resolve(&p, "step.length").is_none());
        assert!(resolve(&p, "resultData.l2CacheResults.0").is_none());
    }

    #[test]
    fn test_empty_segments_are_absent() {
        let p = payload();
        assert!(resolve(&p, "").is_none());
        assert!(resolve(&p, "resultData..l1CacheHit").is_none());
    }

    #[test]
    fn test_resolution_does_not_mutate() {
        let p = payload();
        let before = p.to_string();
        let _ = resolve(&p, "resultData.l1CacheHit");
        let _ = resolve(&p, "resultData.absent.deeper");
        assert_eq!(p.to_string(), before);
    }

    #[test]
    fn test_container_value_returned() {
        let p = payload();
        let list = resolve(&p, "resultData.l2CacheResults").unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(2));
    }
}
