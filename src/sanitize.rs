//! Privacy-Preserving Event Sanitization
//!
//! Produces a transmit-safe copy of an event before it leaves the machine:
//! whitelist filtering of top-level property keys, then replacement of long
//! string values by a hash-and-length structure. Raw content of a long
//! string is never transmitted.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::constants::MAX_STRING_PROP_LEN;
use crate::event::TelemetryEvent;

/// Build the transmit-safe copy of an event.
///
/// A non-empty whitelist drops every top-level property key not in it.
/// Remaining string values longer than [`MAX_STRING_PROP_LEN`] characters
/// are replaced by `{ "hash": <sha256 hex>, "len": <chars> }`. Shorter
/// strings and non-string values pass through unchanged. An empty resulting
/// map is omitted entirely.
pub fn sanitize(event: &TelemetryEvent, whitelist: Option<&[String]>) -> TelemetryEvent {
    let mut out = event.clone();

    let props = match out.props.take() {
        Some(p) => p,
        None => return out,
    };

    let filtered = props.into_iter().filter(|(key, _)| match whitelist {
        Some(list) if !list.is_empty() => list.iter().any(|w| w == key),
        _ => true,
    });

    let mut safe = crate::event::Props::new();
    for (key, value) in filtered {
        safe.insert(key, sanitize_value(value));
    }

    if !safe.is_empty() {
        out.props = Some(safe);
    }
    out
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let len = s.chars().count();
            if len > MAX_STRING_PROP_LEN {
                json!({ "hash": hash_hex(&s), "len": len })
            } else {
                Value::String(s)
            }
        }
        other => other,
    }
}

fn hash_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Props;
    use serde_json::json;

    fn event_with(props: Props) -> TelemetryEvent {
        TelemetryEvent {
            ts: "2026-01-01T00:00:00+00:00".to_string(),
            event: "story.save".to_string(),
            props: Some(props),
            install_id: "i".to_string(),
            session_id: "s".to_string(),
            seq: 1,
        }
    }

    #[test]
    fn test_whitelist_drops_unlisted_keys() {
        let mut props = Props::new();
        props.insert("a".to_string(), json!("x"));
        props.insert("b".to_string(), json!("y"));

        let whitelist = vec!["a".to_string()];
        let safe = sanitize(&event_with(props), Some(&whitelist));

        let out = safe.props.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("a"), Some(&json!("x")));
    }

    #[test]
    fn test_empty_whitelist_passes_everything() {
        let mut props = Props::new();
        props.insert("a".to_string(), json!(1));
        props.insert("b".to_string(), json!(true));

        let safe = sanitize(&event_with(props), Some(&[]));
        assert_eq!(safe.props.unwrap().len(), 2);
    }

    #[test]
    fn test_string_boundary_is_strictly_greater_than_100() {
        let exactly_100: String = "a".repeat(100);
        let over_100: String = "a".repeat(101);

        let mut props = Props::new();
        props.insert("short".to_string(), json!(exactly_100.clone()));
        props.insert("long".to_string(), json!(over_100));

        let safe = sanitize(&event_with(props), None);
        let out = safe.props.unwrap();

        assert_eq!(out.get("short"), Some(&json!(exactly_100)));

        let hashed = out.get("long").unwrap();
        assert_eq!(hashed.get("len"), Some(&json!(101)));
        let hash = hashed.get("hash").unwrap().as_str().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(!hashed.to_string().contains("aaaa"));
    }

    #[test]
    fn test_non_string_values_pass_through() {
        let mut props = Props::new();
        props.insert("count".to_string(), json!(12345));
        props.insert("nested".to_string(), json!({ "deep": "a".repeat(500) }));

        let safe = sanitize(&event_with(props), None);
        let out = safe.props.unwrap();
        assert_eq!(out.get("count"), Some(&json!(12345)));
        // Hashing applies to top-level string values only
        assert_eq!(out.get("nested"), Some(&json!({ "deep": "a".repeat(500) })));
    }

    #[test]
    fn test_empty_result_omits_props() {
        let mut props = Props::new();
        props.insert("secret".to_string(), json!("x"));

        let whitelist = vec!["allowed".to_string()];
        let safe = sanitize(&event_with(props), Some(&whitelist));
        assert!(safe.props.is_none());
    }

    #[test]
    fn test_event_without_props_is_untouched() {
        let mut ev = event_with(Props::new());
        ev.props = None;
        let safe = sanitize(&ev, None);
        assert!(safe.props.is_none());
        assert_eq!(safe.seq, ev.seq);
    }
}
