use super::MANAGER_NAME;
use devserver_types::*;
use kube::{
    Api, Client, Error,
    api::{Patch, PatchParams, Resource},
    core::{ClusterResourceScope, NamespaceResourceScope},
};
use serde::{Serialize, de::DeserializeOwned};
use std::{clone::Clone, fmt::Debug};

/// Maximum length `status.message` is truncated to before being patched, so
/// a chatty error doesn't blow out etcd's per-object size limit.
const MAX_MESSAGE_LEN: usize = 1024;

pub trait Object<S> {
    /// Returns a mutable reference to the status object, initializing it
    /// with the default value if it does not exist.
    fn mut_status(&mut self) -> &mut S;
}

impl Object<DevServerStatus> for DevServer {
    fn mut_status(&mut self) -> &mut DevServerStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl Object<DevServerFlavorStatus> for DevServerFlavor {
    fn mut_status(&mut self) -> &mut DevServerFlavorStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl Object<DevServerUserStatus> for DevServerUser {
    fn mut_status(&mut self) -> &mut DevServerUserStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

fn truncate_message(message: &mut Option<String>) {
    if let Some(m) = message
        && m.len() > MAX_MESSAGE_LEN
    {
        m.truncate(MAX_MESSAGE_LEN);
    }
}

/// Patches a namespaced resource's status with the provided function via a
/// JSON merge patch computed between the unmodified and mutated instance.
pub async fn patch_status<S, T>(client: Client, instance: &T, f: impl FnOnce(&mut S)) -> Result<T, Error>
where
    <T as Resource>::DynamicType: Default,
    T: Clone
        + Resource
        + Object<S>
        + Serialize
        + DeserializeOwned
        + Debug
        + Resource<Scope = NamespaceResourceScope>,
{
    let patch = Patch::Json::<T>({
        let mut modified = instance.clone();
        f(modified.mut_status());
        json_patch::diff(
            &serde_json::to_value(instance).unwrap(),
            &serde_json::to_value(&modified).unwrap(),
        )
    });
    let name = instance.meta().name.as_deref().unwrap();
    let namespace = instance.meta().namespace.as_deref().unwrap();
    let api: Api<T> = Api::namespaced(client, namespace);
    api.patch_status(name, &PatchParams::apply(MANAGER_NAME), &patch)
        .await
}

/// As `patch_status`, but for cluster-scoped resources (`DevServerFlavor`,
/// `DevServerUser`).
pub async fn patch_status_cluster<S, T>(
    client: Client,
    instance: &T,
    f: impl FnOnce(&mut S),
) -> Result<T, Error>
where
    <T as Resource>::DynamicType: Default,
    T: Clone
        + Resource
        + Object<S>
        + Serialize
        + DeserializeOwned
        + Debug
        + Resource<Scope = ClusterResourceScope>,
{
    let patch = Patch::Json::<T>({
        let mut modified = instance.clone();
        f(modified.mut_status());
        json_patch::diff(
            &serde_json::to_value(instance).unwrap(),
            &serde_json::to_value(&modified).unwrap(),
        )
    });
    let name = instance.meta().name.as_deref().unwrap();
    let api: Api<T> = Api::all(client);
    api.patch_status(name, &PatchParams::apply(MANAGER_NAME), &patch)
        .await
}

pub fn set_message(message: &mut Option<String>, value: String) {
    *message = Some(value);
    truncate_message(message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_untouched() {
        let mut message = None;
        set_message(&mut message, "DevServer 'alice' reconciled".to_string());
        assert_eq!(message.as_deref(), Some("DevServer 'alice' reconciled"));
    }

    #[test]
    fn long_message_is_truncated_to_1kib() {
        let mut message = None;
        set_message(&mut message, "x".repeat(2048));
        assert_eq!(message.unwrap().len(), MAX_MESSAGE_LEN);
    }
}
