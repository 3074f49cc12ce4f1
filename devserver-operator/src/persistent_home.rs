//! Legacy `spec.persistentHome` support: auto-provisions a PVC for `/home/dev`
//! when a DevServer opts in, rather than a StatefulSet volume-claim-template
//! (this operator standardized on Deployment, see DESIGN.md). Deprecated in
//! favor of the explicit `spec.volumes` interface; `spec.volumes` always wins
//! when both target `/home/dev` (enforced by the builder's merge order, not
//! here).

use devserver_types::{DevServer, PersistentHomeSpec};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;

use crate::util::Error;

pub fn claim_name(devserver_name: &str) -> String {
    format!("{devserver_name}-home")
}

/// If `spec.persistentHome.enabled`, ensures `<name>-home` PVC exists
/// (create-once, like the host-key Secret) and returns its claim name.
/// Returns `None` when `persistentHome` is absent or disabled.
pub async fn ensure_persistent_home(
    client: Client,
    instance: &DevServer,
    persistent_home: Option<&PersistentHomeSpec>,
    default_size: &str,
) -> Result<Option<String>, Error> {
    let Some(spec) = persistent_home else {
        return Ok(None);
    };
    if !spec.enabled {
        return Ok(None);
    }

    let namespace = instance
        .namespace()
        .ok_or_else(|| Error::UserInput("DevServer is missing metadata.namespace".to_string()))?;
    let name = claim_name(&instance.name_any());
    let api: Api<PersistentVolumeClaim> = Api::namespaced(client, &namespace);

    match api.get(&name).await {
        Ok(_) => return Ok(Some(name)),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => return Err(e.into()),
    }

    let size = spec.size.clone().unwrap_or_else(|| default_size.to_string());
    let owner: OwnerReference = instance
        .controller_owner_ref(&())
        .ok_or_else(|| Error::UserInput("DevServer is missing uid/apiVersion".to_string()))?;

    let pvc = PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), Quantity(size))])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        status: None,
    };

    match api.create(&Default::default(), &pvc).await {
        Ok(_) => Ok(Some(name)),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(Some(name)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_name_is_home_suffixed() {
        assert_eq!(claim_name("alice"), "alice-home");
    }
}
