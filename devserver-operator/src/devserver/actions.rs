use devserver_types::{DevServer, DevServerFlavorSpec, DevServerPhase};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client, ResourceExt, api::Resource};
use std::collections::BTreeMap;

use crate::builders::{DeploymentInputs, OperatorAssets, build_deployment, build_ssh_service, configmap};
use crate::hostkeys;
use crate::persistent_home;
use crate::util::{
    Error,
    patch::{patch_status, set_message},
};

const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

fn instance_namespace(instance: &DevServer) -> Result<String, Error> {
    instance
        .namespace()
        .ok_or_else(|| Error::UserInput("DevServer is missing metadata.namespace".to_string()))
}

/// Annotations/labels the owning `DevServer` carries that should be
/// forwarded onto the children it provisions, with the cluster's own
/// bookkeeping annotation stripped.
fn extra_metadata(instance: &DevServer) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut annotations = instance.annotations().clone();
    annotations.remove(LAST_APPLIED_ANNOTATION);
    (annotations, instance.labels().clone())
}

pub async fn failed(client: Client, instance: &DevServer, reason: String) -> Result<(), Error> {
    patch_status(client, instance, |status| {
        status.phase = DevServerPhase::Failed;
        set_message(&mut status.message, reason);
    })
    .await?;
    Ok(())
}

/// Provisions host keys then creates-or-applies the ConfigMaps, optional
/// Service, and Deployment, in that order (configs before the Deployment
/// that mounts them, matching `reconciler.py`), finally marking the
/// DevServer Running.
pub async fn reconcile_children(
    client: Client,
    instance: &DevServer,
    flavor: &DevServerFlavorSpec,
    assets: &OperatorAssets,
    default_devserver_image: &str,
    static_dependencies_image: &str,
    default_persistent_home_size: &str,
) -> Result<(), Error> {
    let namespace = instance_namespace(instance)?;
    let name = instance.name_any();
    let owner = instance
        .controller_owner_ref(&())
        .ok_or_else(|| Error::UserInput("DevServer is missing uid/apiVersion".to_string()))?;

    hostkeys::ensure_host_keys(client.clone(), instance).await?;
    let persistent_home_claim = persistent_home::ensure_persistent_home(
        client.clone(),
        instance,
        instance.spec.persistent_home.as_ref(),
        default_persistent_home_size,
    )
    .await?;

    let (extra_annotations, extra_labels) = extra_metadata(instance);

    let configmaps = [
        configmap::build_startup_configmap(&name, &namespace, &owner, &assets.startup_script, &extra_annotations, &extra_labels),
        configmap::build_login_configmap(&name, &namespace, &owner, &assets.login_script, &extra_annotations, &extra_labels),
        configmap::build_sshd_configmap(&name, &namespace, &owner, &assets.sshd_config, &extra_annotations, &extra_labels),
    ];
    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), &namespace);
    for cm in &configmaps {
        apply_or_create(&cm_api, cm).await?;
    }

    if instance.spec.ssh.expose_service {
        let svc = build_ssh_service(&name, &namespace, &owner, &extra_annotations, &extra_labels);
        let svc_api: Api<Service> = Api::namespaced(client.clone(), &namespace);
        apply_or_create(&svc_api, &svc).await?;
    }

    let deployment = build_deployment(&DeploymentInputs {
        name: &name,
        namespace: &namespace,
        spec: &instance.spec,
        flavor,
        default_devserver_image,
        static_dependencies_image,
        owner,
        persistent_home_claim: persistent_home_claim.as_deref(),
        extra_annotations: &extra_annotations,
        extra_labels: &extra_labels,
    });
    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), &namespace);
    apply_or_create(&dep_api, &deployment).await?;

    patch_status(client, instance, |status| {
        status.phase = DevServerPhase::Running;
        set_message(&mut status.message, format!("DevServer '{name}' reconciled"));
    })
    .await?;
    Ok(())
}

async fn apply_or_create<K>(api: &Api<K>, obj: &K) -> Result<(), Error>
where
    K: Clone
        + std::fmt::Debug
        + serde::Serialize
        + serde::de::DeserializeOwned
        + Resource
        + 'static,
    <K as Resource>::DynamicType: Default,
{
    let name = obj.meta().name.clone().expect("object must have a name");
    let patch = kube::api::Patch::Apply(obj);
    match api
        .patch(&name, &kube::api::PatchParams::apply("devserver-operator"), &patch)
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            match api.create(&Default::default(), obj).await {
                Ok(_) => Ok(()),
                Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}
