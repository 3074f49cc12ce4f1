//! Re-entrant watch-then-confirm protocol for waiting on a subset of an
//! object's status to appear.
//!
//! Callers pass a `serde_json::Value` subset (typically just the fields they
//! care about, e.g. `json!({"phase": "Running"})`) rather than a whole typed
//! status, so they never need to know about fields added later.

use futures::StreamExt;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::Error;

/// `subset ⊆ superset`: every key present in `subset` must be present in
/// `superset` with a recursively matching value. Scalars compare equal.
pub fn matches_subset(subset: &Value, superset: &Value) -> bool {
    match (subset, superset) {
        (Value::Object(sub), Value::Object(sup)) => sub
            .iter()
            .all(|(k, v)| sup.get(k).is_some_and(|sv| matches_subset(v, sv))),
        (a, b) => a == b,
    }
}

fn status_matches<K: serde::Serialize>(obj: &K, subset: &Value) -> Result<bool, Error> {
    let status = serde_json::to_value(obj)?
        .get("status")
        .cloned()
        .unwrap_or(Value::Null);
    Ok(matches_subset(subset, &status))
}

/// Waits until `name`'s `status` is a superset of `subset`, or `timeout`
/// elapses. Every object observed along the way (the initial `get`, each
/// watched event, and the confirming re-`get`s) is handed to the caller's
/// `on_event` callback before being checked against `subset`, so a caller
/// can log or otherwise react to intermediate states rather than only the
/// final result.
///
/// 1. `get` once; return immediately if already matching.
/// 2. Watch (scoped to this object by a field selector) until a matching
///    event arrives or the stream ends.
/// 3. On a match, re-`get` to confirm the event wasn't stale.
/// 4. If the stream ends without a match and time remains, re-open it.
/// 5. On timeout, perform one final `get`-and-check before failing.
pub async fn wait_for_status<K>(
    api: &Api<K>,
    name: &str,
    subset: Value,
    timeout: Duration,
    mut on_event: Option<&mut dyn FnMut(&K)>,
) -> Result<K, Error>
where
    K: Resource + Clone + Debug + DeserializeOwned + serde::Serialize + Send + Sync + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let deadline = Instant::now() + timeout;

    loop {
        let current = api.get(name).await?;
        if let Some(cb) = on_event.as_deref_mut() {
            cb(&current);
        }
        if status_matches(&current, &subset)? {
            return Ok(current);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout);
        }

        let cfg = watcher::Config::default().fields(&format!("metadata.name={name}"));
        let stream = watcher(api.clone(), cfg).applied_objects();
        tokio::pin!(stream);

        let outcome = tokio::time::timeout(remaining, async {
            while let Some(event) = stream.next().await {
                let obj = event?;
                if let Some(cb) = on_event.as_deref_mut() {
                    cb(&obj);
                }
                if status_matches(&obj, &subset)? {
                    return Ok::<_, Error>(Some(obj));
                }
            }
            Ok(None)
        })
        .await;

        match outcome {
            Ok(Ok(Some(_))) => {
                let confirmed = api.get(name).await?;
                if let Some(cb) = on_event.as_deref_mut() {
                    cb(&confirmed);
                }
                if status_matches(&confirmed, &subset)? {
                    return Ok(confirmed);
                }
                // Stale event; loop and watch again with whatever time remains.
            }
            Ok(Ok(None)) => {
                // Stream ended (e.g. relist boundary); loop back if time remains.
            }
            Ok(Err(e)) => return Err(e),
            Err(_elapsed) => {
                let last = api.get(name).await?;
                if let Some(cb) = on_event.as_deref_mut() {
                    cb(&last);
                }
                return if status_matches(&last, &subset)? {
                    Ok(last)
                } else {
                    Err(Error::Timeout)
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_match() {
        assert!(matches_subset(&json!("Running"), &json!("Running")));
        assert!(!matches_subset(&json!("Running"), &json!("Pending")));
    }

    #[test]
    fn subset_of_object_matches() {
        let subset = json!({"phase": "Running"});
        let superset = json!({"phase": "Running", "message": "devserver reconciled"});
        assert!(matches_subset(&subset, &superset));
    }

    #[test]
    fn missing_key_does_not_match() {
        let subset = json!({"phase": "Running", "namespace": "dev-alice"});
        let superset = json!({"phase": "Running"});
        assert!(!matches_subset(&subset, &superset));
    }

    #[test]
    fn mismatched_value_does_not_match() {
        let subset = json!({"phase": "Running"});
        let superset = json!({"phase": "Failed"});
        assert!(!matches_subset(&subset, &superset));
    }

    #[test]
    fn nested_object_subset_matches() {
        let subset = json!({"status": {"phase": "Ready"}});
        let superset = json!({"status": {"phase": "Ready", "namespace": "dev-bob"}, "extra": 1});
        assert!(matches_subset(&subset, &superset));
    }

    #[test]
    fn empty_subset_always_matches() {
        assert!(matches_subset(&json!({}), &json!({"phase": "Running"})));
    }
}
