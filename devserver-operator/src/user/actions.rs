//! Write-phase actions for the `DevServerUser` reconciler (C7), grounded on
//! `reconciler.py`'s create-or-patch-on-404 pattern generalized to RBAC
//! objects instead of workload objects.

use devserver_types::{DevServerUser, DevServerUserPhase};
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client, ResourceExt};

use crate::util::{Error, patch::patch_status_cluster};

fn namespace_for(username: &str) -> String {
    format!("dev-{username}")
}

fn service_account_name(username: &str) -> String {
    format!("{username}-sa")
}

pub async fn failed(client: Client, instance: &DevServerUser, reason: String) -> Result<(), Error> {
    patch_status_cluster(client, instance, |status| {
        status.phase = DevServerUserPhase::Failed;
    })
    .await?;
    eprintln!("DevServerUser '{}' failed: {reason}", instance.name_any());
    Ok(())
}

/// Ensures the namespace, service account, role, and role binding for a
/// `DevServerUser` exist, then marks it Ready with its assigned namespace.
///
/// The Namespace is deliberately created without an owner reference:
/// namespace-scoped objects cannot carry an owner reference to a
/// cluster-scoped resource on every cluster, so cleanup on `DevServerUser`
/// deletion is left to whatever out-of-band process removes the namespace.
pub async fn reconcile_children(client: Client, instance: &DevServerUser) -> Result<(), Error> {
    let username = instance.spec.username.clone();
    let namespace = namespace_for(&username);
    let sa_name = service_account_name(&username);

    ensure_namespace(client.clone(), &namespace).await?;
    ensure_service_account(client.clone(), &namespace, &sa_name).await?;
    ensure_role(client.clone(), &namespace).await?;
    ensure_role_binding(client.clone(), &namespace, &username, &sa_name).await?;

    patch_status_cluster(client, instance, |status| {
        status.phase = DevServerUserPhase::Ready;
        if status.namespace.is_none() {
            status.namespace = Some(namespace.clone());
        }
    })
    .await?;
    Ok(())
}

async fn ensure_namespace(client: Client, name: &str) -> Result<(), Error> {
    let api: Api<Namespace> = Api::all(client);
    match api.get(name).await {
        Ok(_) => return Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => return Err(e.into()),
    }
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    match api.create(&Default::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_service_account(client: Client, namespace: &str, name: &str) -> Result<(), Error> {
    let api: Api<ServiceAccount> = Api::namespaced(client, namespace);
    let sa = ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    apply_or_create(&api, &sa).await
}

async fn ensure_role(client: Client, namespace: &str) -> Result<(), Error> {
    let api: Api<Role> = Api::namespaced(client, namespace);
    let role = Role {
        metadata: ObjectMeta {
            name: Some("devserver-user".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec!["devserver.io".to_string()]),
                resources: Some(vec![
                    "devservers".to_string(),
                    "devserverflavors".to_string(),
                    "devserverusers".to_string(),
                ]),
                verbs: vec![
                    "create".to_string(),
                    "list".to_string(),
                    "get".to_string(),
                    "watch".to_string(),
                    "delete".to_string(),
                ],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec!["pods".to_string()]),
                verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec!["pods/exec".to_string()]),
                verbs: vec!["create".to_string()],
                ..Default::default()
            },
        ]),
    };
    apply_or_create(&api, &role).await
}

async fn ensure_role_binding(
    client: Client,
    namespace: &str,
    username: &str,
    sa_name: &str,
) -> Result<(), Error> {
    let api: Api<RoleBinding> = Api::namespaced(client, namespace);
    let binding = RoleBinding {
        metadata: ObjectMeta {
            name: Some("devserver-user".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: "devserver-user".to_string(),
        },
        subjects: Some(vec![
            Subject {
                kind: "User".to_string(),
                name: username.to_string(),
                api_group: Some("rbac.authorization.k8s.io".to_string()),
                ..Default::default()
            },
            Subject {
                kind: "ServiceAccount".to_string(),
                name: sa_name.to_string(),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
        ]),
    };
    apply_or_create(&api, &binding).await
}

async fn apply_or_create<K>(api: &Api<K>, obj: &K) -> Result<(), Error>
where
    K: Clone
        + std::fmt::Debug
        + serde::Serialize
        + serde::de::DeserializeOwned
        + kube::api::Resource
        + 'static,
    <K as kube::api::Resource>::DynamicType: Default,
{
    let name = obj.meta().name.clone().expect("object must have a name");
    let patch = kube::api::Patch::Apply(obj);
    match api
        .patch(&name, &kube::api::PatchParams::apply("devserver-operator"), &patch)
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => match api.create(&Default::default(), obj).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_dev_prefixed() {
        assert_eq!(namespace_for("alice"), "dev-alice");
    }

    #[test]
    fn service_account_is_username_suffixed() {
        assert_eq!(service_account_name("alice"), "alice-sa");
    }
}
