//! ConfigMap builders for the three text assets mounted into the DevServer
//! pod. Asset contents are supplied by the caller (`OperatorAssets`) rather
//! than baked into the binary, so they can be swapped via the operator's
//! config without a rebuild.

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

fn configmap(
    name: String,
    namespace: &str,
    owner: &OwnerReference,
    key: &str,
    content: &str,
    extra_annotations: &BTreeMap<String, String>,
    extra_labels: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner.clone()]),
            labels: (!extra_labels.is_empty()).then(|| extra_labels.clone()),
            annotations: (!extra_annotations.is_empty()).then(|| extra_annotations.clone()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(key.to_string(), content.to_string())])),
        ..Default::default()
    }
}

pub fn build_startup_configmap(
    name: &str,
    namespace: &str,
    owner: &OwnerReference,
    startup_script: &str,
    extra_annotations: &BTreeMap<String, String>,
    extra_labels: &BTreeMap<String, String>,
) -> ConfigMap {
    configmap(
        format!("{name}-startup-script"),
        namespace,
        owner,
        "startup.sh",
        startup_script,
        extra_annotations,
        extra_labels,
    )
}

pub fn build_login_configmap(
    name: &str,
    namespace: &str,
    owner: &OwnerReference,
    login_script: &str,
    extra_annotations: &BTreeMap<String, String>,
    extra_labels: &BTreeMap<String, String>,
) -> ConfigMap {
    configmap(
        format!("{name}-login-script"),
        namespace,
        owner,
        "user_login.sh",
        login_script,
        extra_annotations,
        extra_labels,
    )
}

pub fn build_sshd_configmap(
    name: &str,
    namespace: &str,
    owner: &OwnerReference,
    sshd_config: &str,
    extra_annotations: &BTreeMap<String, String>,
    extra_labels: &BTreeMap<String, String>,
) -> ConfigMap {
    configmap(
        format!("{name}-sshd-config"),
        namespace,
        owner,
        "sshd_config",
        sshd_config,
        extra_annotations,
        extra_labels,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "devserver.io/v1".to_string(),
            kind: "DevServer".to_string(),
            name: "alice".to_string(),
            uid: "uid".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn startup_configmap_name_and_key() {
        let cm = build_startup_configmap(
            "alice",
            "dev-alice",
            &owner(),
            "#!/bin/sh\n",
            &BTreeMap::new(),
            &BTreeMap::new(),
        );
        assert_eq!(cm.metadata.name.as_deref(), Some("alice-startup-script"));
        assert!(cm.data.unwrap().contains_key("startup.sh"));
    }
}
