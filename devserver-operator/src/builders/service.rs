//! Builds the optional `Service` exposing SSH (port 22). Only built when
//! `spec.ssh.exposeService` is set; the default access path is
//! port-forward, not a cluster-routable Service.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub fn build_ssh_service(
    name: &str,
    namespace: &str,
    owner: &OwnerReference,
    extra_annotations: &BTreeMap<String, String>,
    extra_labels: &BTreeMap<String, String>,
) -> Service {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    let mut metadata_labels = labels.clone();
    metadata_labels.extend(extra_labels.clone());
    Service {
        metadata: ObjectMeta {
            name: Some(format!("{name}-ssh")),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner.clone()]),
            labels: Some(metadata_labels),
            annotations: (!extra_annotations.is_empty()).then(|| extra_annotations.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                port: 22,
                target_port: Some(IntOrString::Int(22)),
                name: Some("ssh".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_exposes_port_22() {
        let owner = OwnerReference {
            api_version: "devserver.io/v1".to_string(),
            kind: "DevServer".to_string(),
            name: "alice".to_string(),
            uid: "uid".to_string(),
            ..Default::default()
        };
        let svc = build_ssh_service("alice", "dev-alice", &owner, &BTreeMap::new(), &BTreeMap::new());
        let ports = svc.spec.unwrap().ports.unwrap();
        assert_eq!(ports[0].port, 22);
    }

    #[test]
    fn extra_labels_land_on_metadata_not_selector() {
        let owner = OwnerReference {
            api_version: "devserver.io/v1".to_string(),
            kind: "DevServer".to_string(),
            name: "alice".to_string(),
            uid: "uid".to_string(),
            ..Default::default()
        };
        let extra_labels = BTreeMap::from([("team".to_string(), "platform".to_string())]);
        let svc = build_ssh_service("alice", "dev-alice", &owner, &BTreeMap::new(), &extra_labels);
        assert_eq!(svc.metadata.labels.unwrap().get("team").map(String::as_str), Some("platform"));
        assert!(!svc.spec.unwrap().selector.unwrap().contains_key("team"));
    }
}
