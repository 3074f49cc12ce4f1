//! Thin wrapper around `kube::runtime::events::Recorder`, gated by the
//! `postingEnabled` operator setting (spec.md §4.9). Off by default: emitting
//! a Kubernetes `Event` object on every reconcile would otherwise put
//! needless write load on the API server for a controller that already
//! reports state through `status` and the process log.

use kube::runtime::events::{Event, Recorder, Reporter};
use kube::{Client, Resource};

use super::MANAGER_NAME;

/// Publishes `event` against `obj` if `posting_enabled`. Failures to publish
/// are logged and otherwise swallowed — a missed cluster Event must never
/// fail a reconcile.
pub async fn publish<K>(client: Client, posting_enabled: bool, obj: &K, event: Event)
where
    K: Resource<DynamicType = ()>,
{
    if !posting_enabled {
        return;
    }
    let reporter = Reporter {
        controller: MANAGER_NAME.to_string(),
        instance: None,
    };
    let recorder = Recorder::new(client, reporter, obj.object_ref(&()));
    if let Err(e) = recorder.publish(event).await {
        eprintln!("failed to publish event for {}: {e}", obj.meta().name.as_deref().unwrap_or("<unknown>"));
    }
}
