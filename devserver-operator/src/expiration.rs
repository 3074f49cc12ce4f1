//! TTL expiration controller (C9), grounded on
//! `lifecycle.py::check_and_expire_devservers`: a periodic sweep rather than
//! a per-object timer, acceptable for small-to-medium clusters.

use devserver_types::DevServer;
use k8s_openapi::jiff::Timestamp;
use kube::ResourceExt;
use owo_colors::OwoColorize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::util::colors::FG2;

#[cfg(feature = "metrics")]
use prometheus::{IntCounter, register_int_counter};
#[cfg(feature = "metrics")]
use std::sync::LazyLock;

#[cfg(feature = "metrics")]
static EXPIRED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "devserver_operator_devservers_expired_total",
        "Total number of DevServers deleted by the TTL expiration sweep"
    )
    .expect("register devservers_expired_total")
});

/// Whether `devserver` has outlived `spec.lifecycle.timeToLive`, computed
/// from `metadata.creationTimestamp`. A DevServer with no TTL never expires.
fn is_expired(devserver: &DevServer) -> bool {
    let Some(ttl_str) = devserver.spec.lifecycle.time_to_live.as_deref() else {
        return false;
    };
    let Ok(ttl) = parse_duration::parse(ttl_str) else {
        return false;
    };
    let Some(created) = devserver.meta().creation_timestamp.as_ref() else {
        return false;
    };
    let elapsed = Timestamp::now().duration_since(created.0);
    let Ok(elapsed): Result<Duration, _> = elapsed.try_into() else {
        return false;
    };
    elapsed > ttl
}

pub async fn run(client: kube::Client, interval: Duration, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }
        sweep_once(client.clone()).await;
    }
}

async fn sweep_once(client: kube::Client) {
    let devservers = match devserver_client::devserver::list_all(client.clone()).await {
        Ok(items) => items,
        Err(e) => {
            eprintln!("{}", format!("expiration sweep: failed to list DevServers: {e}").red());
            return;
        }
    };

    let expired: Vec<&DevServer> = devservers.iter().filter(|ds| is_expired(ds)).collect();
    if expired.is_empty() {
        return;
    }

    let deletions = expired.iter().map(|ds| {
        let client = client.clone();
        let name = ds.name_any();
        let namespace = ds.namespace().unwrap_or_default();
        async move {
            match devserver_client::devserver::delete(client, &namespace, &name).await {
                Ok(()) => {
                    println!(
                        "{}",
                        format!("'{namespace}/{name}' expired and was deleted").color(FG2)
                    );
                    true
                }
                Err(e) => {
                    eprintln!("{}", format!("failed to delete expired DevServer '{namespace}/{name}': {e}").red());
                    false
                }
            }
        }
    });

    let results = futures::future::join_all(deletions).await;
    #[cfg(feature = "metrics")]
    EXPIRED_TOTAL.inc_by(results.iter().filter(|ok| **ok).count() as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = results;
}

#[cfg(test)]
mod tests {
    use super::*;
    use devserver_types::{DevServerSpec, LifecycleSpec, SshSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    fn devserver_created(seconds_ago: i64, ttl: Option<&str>) -> DevServer {
        let created = Timestamp::new(Timestamp::now().as_second() - seconds_ago, 0).unwrap();
        DevServer {
            metadata: ObjectMeta {
                name: Some("d1".to_string()),
                namespace: Some("ns".to_string()),
                creation_timestamp: Some(Time(created)),
                ..Default::default()
            },
            spec: DevServerSpec {
                flavor: "small".to_string(),
                image: None,
                ssh: SshSpec::default(),
                lifecycle: LifecycleSpec {
                    time_to_live: ttl.map(str::to_string),
                },
                volumes: vec![],
                persistent_home: None,
            },
            status: None,
        }
    }

    #[test]
    fn no_ttl_never_expires() {
        assert!(!is_expired(&devserver_created(100_000, None)));
    }

    #[test]
    fn within_ttl_is_not_expired() {
        assert!(!is_expired(&devserver_created(60, Some("1h"))));
    }

    #[test]
    fn past_ttl_is_expired() {
        assert!(is_expired(&devserver_created(7200, Some("1h"))));
    }

    #[test]
    fn garbage_ttl_never_expires() {
        assert!(!is_expired(&devserver_created(7200, Some("not-a-duration"))));
    }
}
