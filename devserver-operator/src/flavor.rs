//! Periodic default-flavor reconciler (C8).
//!
//! Unlike the `DevServer`/`DevServerUser` reconcilers this is a plain
//! `tokio::time::interval` loop rather than a `kube::runtime::Controller`
//! watch: there's no child resource to own and no edge worth reacting to
//! faster than the next tick, matching the original's
//! `reconcile_flavors_periodically`.

use devserver_types::DevServerFlavor;
use kube::{Client, ResourceExt};
use owo_colors::OwoColorize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::util::{colors::FG2, patch::patch_status_cluster};

const DEFAULT_ANNOTATION: &str = "devserver.io/default";

/// Picks the name of the flavor that should be marked default: the
/// lexicographically smallest name among those annotated
/// `devserver.io/default=true`, or `None` if no flavor is annotated.
fn pick_default(flavors: &[DevServerFlavor]) -> Option<String> {
    flavors
        .iter()
        .filter(|f| {
            f.annotations()
                .get(DEFAULT_ANNOTATION)
                .is_some_and(|v| v == "true")
        })
        .map(|f| f.name_any())
        .min()
}

pub async fn run(client: Client, interval: Duration, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }
        if let Err(e) = reconcile_once(client.clone()).await {
            eprintln!("{}", format!("flavor reconciliation failed: {e}").red());
        }
    }
}

async fn reconcile_once(client: Client) -> Result<(), crate::util::Error> {
    let flavors = devserver_client::flavor::list(client.clone())
        .await
        .map_err(|e| crate::util::Error::Client { source: e })?;
    let default_name = pick_default(&flavors);

    for flavor in &flavors {
        let should_be_default = Some(flavor.name_any()) == default_name;
        let currently_default = flavor.status.as_ref().is_some_and(|s| s.default);
        if should_be_default == currently_default {
            continue;
        }
        patch_status_cluster(client.clone(), flavor, |status| {
            status.default = should_be_default;
        })
        .await?;
        println!(
            "{}",
            format!("flavor '{}' default = {should_be_default}", flavor.name_any()).color(FG2)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devserver_types::DevServerFlavorSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn flavor(name: &str, default_annotation: Option<&str>) -> DevServerFlavor {
        let mut annotations = BTreeMap::new();
        if let Some(v) = default_annotation {
            annotations.insert(DEFAULT_ANNOTATION.to_string(), v.to_string());
        }
        DevServerFlavor {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: DevServerFlavorSpec::default(),
            status: None,
        }
    }

    #[test]
    fn no_annotated_flavor_means_no_default() {
        let flavors = vec![flavor("small", None), flavor("large", None)];
        assert_eq!(pick_default(&flavors), None);
    }

    #[test]
    fn single_annotated_flavor_wins() {
        let flavors = vec![flavor("small", None), flavor("large", Some("true"))];
        assert_eq!(pick_default(&flavors), Some("large".to_string()));
    }

    #[test]
    fn tie_breaks_on_lexicographically_smallest_name() {
        let flavors = vec![flavor("zeta", Some("true")), flavor("alpha", Some("true"))];
        assert_eq!(pick_default(&flavors), Some("alpha".to_string()));
    }

    #[test]
    fn annotation_value_must_be_exactly_true() {
        let flavors = vec![flavor("small", Some("yes"))];
        assert_eq!(pick_default(&flavors), None);
    }
}
