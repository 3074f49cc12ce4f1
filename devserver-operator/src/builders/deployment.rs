//! Builds the `Deployment` that runs the DevServer's sshd.
//!
//! Grounded on `deployment.py`'s `build_deployment`: same init container that
//! copies portable sshd binaries into a shared `emptyDir`, same volume
//! layout, same `Recreate` strategy (a single replica; no rolling update
//! makes sense for a personal dev box).

use devserver_types::{DevServerFlavorSpec, DevServerSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

use super::volumes::{HOME_MOUNT_PATH, home_volume_specified, merge_volumes, stable_volume_name};

pub const STARTUP_SCRIPT_MOUNT: &str = "/devserver";
pub const LOGIN_SCRIPT_MOUNT: &str = "/devserver-login/user_login.sh";
pub const SSHD_CONFIG_MOUNT: &str = "/opt/ssh/sshd_config";
pub const HOST_KEYS_MOUNT: &str = "/opt/ssh/hostkeys";

const INSTALL_SSHD_SCRIPT: &str = r#"set -ex
echo "[INIT] Copying portable binaries..."
cp /usr/local/bin/sshd /opt/bin/
cp /usr/local/bin/scp /opt/bin/
cp /usr/local/bin/sftp-server /opt/bin/
cp /usr/local/bin/ssh-keygen /opt/bin/
cp /usr/local/bin/doas /opt/bin/
chmod +x /opt/bin/sshd
chmod u+s /opt/bin/doas
chmod +x /opt/bin/doas
echo "[INIT] Binaries copied."
"#;

pub struct DeploymentInputs<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub spec: &'a DevServerSpec,
    pub flavor: &'a DevServerFlavorSpec,
    pub default_devserver_image: &'a str,
    pub static_dependencies_image: &'a str,
    pub owner: OwnerReference,
    /// PVC claim name backing `/home/dev`, provisioned ahead of time from
    /// the legacy `spec.persistentHome`. Ignored when `spec.volumes` already
    /// targets `/home/dev` — the explicit interface always wins.
    pub persistent_home_claim: Option<&'a str>,
    /// Additional annotations/labels to stamp onto the Deployment and its
    /// pod template, typically forwarded from the owning `DevServer`'s own
    /// metadata. Never touches the `app` selector label.
    pub extra_annotations: &'a BTreeMap<String, String>,
    pub extra_labels: &'a BTreeMap<String, String>,
}

pub fn build_deployment(inputs: &DeploymentInputs<'_>) -> Deployment {
    let name = inputs.name;
    let image = inputs
        .spec
        .image
        .clone()
        .unwrap_or_else(|| inputs.default_devserver_image.to_string());

    let merged = merge_volumes(&inputs.flavor.volumes, &inputs.spec.volumes);
    let home_specified = home_volume_specified(&merged);

    let mut volumes = vec![
        Volume {
            name: "bin".to_string(),
            empty_dir: Some(Default::default()),
            ..Default::default()
        },
        Volume {
            name: "startup-script".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: format!("{name}-startup-script"),
                default_mode: Some(0o755),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: "login-script".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: format!("{name}-login-script"),
                default_mode: Some(0o755),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: "sshd-config".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: format!("{name}-sshd-config"),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: "host-keys".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(format!("{name}-host-keys")),
                default_mode: Some(0o600),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];

    let mut volume_mounts = vec![
        VolumeMount {
            name: "bin".to_string(),
            mount_path: "/opt/bin".to_string(),
            ..Default::default()
        },
        VolumeMount {
            name: "startup-script".to_string(),
            mount_path: STARTUP_SCRIPT_MOUNT.to_string(),
            read_only: Some(true),
            ..Default::default()
        },
        VolumeMount {
            name: "login-script".to_string(),
            mount_path: LOGIN_SCRIPT_MOUNT.to_string(),
            sub_path: Some("user_login.sh".to_string()),
            read_only: Some(true),
            ..Default::default()
        },
        VolumeMount {
            name: "sshd-config".to_string(),
            mount_path: SSHD_CONFIG_MOUNT.to_string(),
            sub_path: Some("sshd_config".to_string()),
            read_only: Some(true),
            ..Default::default()
        },
        VolumeMount {
            name: "host-keys".to_string(),
            mount_path: HOST_KEYS_MOUNT.to_string(),
            read_only: Some(true),
            ..Default::default()
        },
    ];

    if !home_specified {
        match inputs.persistent_home_claim {
            Some(claim) => {
                volumes.push(Volume {
                    name: "home".to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: claim.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            None => {
                volumes.push(Volume {
                    name: "home".to_string(),
                    empty_dir: Some(Default::default()),
                    ..Default::default()
                });
            }
        }
        volume_mounts.push(VolumeMount {
            name: "home".to_string(),
            mount_path: HOME_MOUNT_PATH.to_string(),
            ..Default::default()
        });
    }

    for v in &merged {
        let volume_name = stable_volume_name(&v.claim_name, &v.mount_path);
        volumes.push(Volume {
            name: volume_name.clone(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: v.claim_name.clone(),
                read_only: Some(v.read_only),
                ..Default::default()
            }),
            ..Default::default()
        });
        volume_mounts.push(VolumeMount {
            name: volume_name,
            mount_path: v.mount_path.clone(),
            read_only: Some(v.read_only),
            ..Default::default()
        });
    }

    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    let mut metadata_labels = labels.clone();
    metadata_labels.extend(inputs.extra_labels.clone());
    let annotations = (!inputs.extra_annotations.is_empty()).then(|| inputs.extra_annotations.clone());

    let pod_spec = PodSpec {
        node_selector: inputs.flavor.node_selector.clone(),
        tolerations: inputs.flavor.tolerations.clone(),
        init_containers: Some(vec![Container {
            name: "install-sshd".to_string(),
            image: Some(inputs.static_dependencies_image.to_string()),
            image_pull_policy: Some("Always".to_string()),
            command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
            args: Some(vec![INSTALL_SSHD_SCRIPT.to_string()]),
            volume_mounts: Some(vec![VolumeMount {
                name: "bin".to_string(),
                mount_path: "/opt/bin".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }]),
        containers: vec![Container {
            name: "devserver".to_string(),
            image: Some(image),
            image_pull_policy: Some("Always".to_string()),
            command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
            args: Some(vec![format!("{STARTUP_SCRIPT_MOUNT}/startup.sh")]),
            ports: Some(vec![ContainerPort {
                container_port: 22,
                ..Default::default()
            }]),
            volume_mounts: Some(volume_mounts),
            resources: Some(inputs.flavor.resources.clone()),
            env: Some(vec![EnvVar {
                name: "SSH_PUBLIC_KEY".to_string(),
                value: Some(inputs.spec.ssh.public_key.clone()),
                ..Default::default()
            }]),
            ..Default::default()
        }],
        volumes: Some(volumes),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(inputs.namespace.to_string()),
            owner_references: Some(vec![inputs.owner.clone()]),
            labels: Some(metadata_labels.clone()),
            annotations: annotations.clone(),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            strategy: Some(DeploymentStrategy {
                type_: Some("Recreate".to_string()),
                rolling_update: None,
            }),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(metadata_labels),
                    annotations,
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devserver_types::{DevServerVolume, SshSpec};
    use k8s_openapi::api::core::v1::ResourceRequirements;

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
    fn default_home_mount_present_without_volumes() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec {
                public_key: "ssh-ed25519 AAAA".to_string(),
                expose_service: false,
            },
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let dep = build_deployment(&DeploymentInputs {
            name: "alice",
            namespace: "dev-alice",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: None,
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        let pod_spec = dep.spec.unwrap().template.spec.unwrap();
        let mounts = pod_spec.containers[0].volume_mounts.as_ref().unwrap();
        assert!(mounts.iter().any(|m| m.mount_path == HOME_MOUNT_PATH && m.name == "home"));
    }

    #[test]
    fn pvc_at_home_path_replaces_default_emptydir() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec {
                public_key: "ssh-ed25519 AAAA".to_string(),
                expose_service: false,
            },
            volumes: vec![DevServerVolume {
                claim_name: "alice-home-pvc".to_string(),
                mount_path: HOME_MOUNT_PATH.to_string(),
                read_only: false,
            }],
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec {
            resources: ResourceRequirements::default(),
            ..Default::default()
        };
        let dep = build_deployment(&DeploymentInputs {
            name: "alice",
            namespace: "dev-alice",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: None,
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        let pod_spec = dep.spec.unwrap().template.spec.unwrap();
        let mounts = pod_spec.containers[0].volume_mounts.as_ref().unwrap();
        let home_mounts: Vec<_> = mounts.iter().filter(|m| m.mount_path == HOME_MOUNT_PATH).collect();
        assert_eq!(home_mounts.len(), 1);
        assert_ne!(home_mounts[0].name, "home");
    }

    #[test]
    fn ssh_public_key_env_var_set() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec {
                public_key: "ssh-ed25519 AAAAtest".to_string(),
                expose_service: false,
            },
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let dep = build_deployment(&DeploymentInputs {
            name: "bob",
            namespace: "dev-bob",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: None,
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        let pod_spec = dep.spec.unwrap().template.spec.unwrap();
        let env = pod_spec.containers[0].env.as_ref().unwrap();
        assert_eq!(env[0].name, "SSH_PUBLIC_KEY");
        assert_eq!(env[0].value.as_deref(), Some("ssh-ed25519 AAAAtest"));
    }

    #[test]
    fn strategy_is_recreate() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec::default(),
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let dep = build_deployment(&DeploymentInputs {
            name: "c",
            namespace: "dev-c",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: None,
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        assert_eq!(
            dep.spec.unwrap().strategy.unwrap().type_.as_deref(),
            Some("Recreate")
        );
    }

    #[test]
    fn persistent_home_claim_backs_default_home_mount() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec::default(),
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let dep = build_deployment(&DeploymentInputs {
            name: "dana",
            namespace: "dev-dana",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: Some("dana-home"),
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        let pod_spec = dep.spec.unwrap().template.spec.unwrap();
        let volumes = pod_spec.volumes.unwrap();
        let home_volume = volumes.iter().find(|v| v.name == "home").unwrap();
        assert_eq!(
            home_volume
                .persistent_volume_claim
                .as_ref()
                .map(|pvc| pvc.claim_name.as_str()),
            Some("dana-home")
        );
        assert!(home_volume.empty_dir.is_none());
    }

    #[test]
    fn explicit_home_volume_wins_over_persistent_home_claim() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec::default(),
            volumes: vec![devserver_types::DevServerVolume {
                claim_name: "explicit-home".to_string(),
                mount_path: HOME_MOUNT_PATH.to_string(),
                read_only: false,
            }],
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let dep = build_deployment(&DeploymentInputs {
            name: "erin",
            namespace: "dev-erin",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: Some("erin-legacy-home"),
            extra_annotations: &BTreeMap::new(),
            extra_labels: &BTreeMap::new(),
        });
        let pod_spec = dep.spec.unwrap().template.spec.unwrap();
        let mounts = pod_spec.containers[0].volume_mounts.as_ref().unwrap();
        let home_mounts: Vec<_> = mounts.iter().filter(|m| m.mount_path == HOME_MOUNT_PATH).collect();
        assert_eq!(home_mounts.len(), 1);
        assert_ne!(home_mounts[0].name, "home");
    }

    #[test]
    fn extra_labels_and_annotations_propagate_without_disturbing_selector() {
        let spec = DevServerSpec {
            flavor: "standard".to_string(),
            ssh: SshSpec::default(),
            ..Default::default()
        };
        let flavor = DevServerFlavorSpec::default();
        let extra_labels = BTreeMap::from([("team".to_string(), "platform".to_string())]);
        let extra_annotations = BTreeMap::from([("owner".to_string(), "alice".to_string())]);
        let dep = build_deployment(&DeploymentInputs {
            name: "frank",
            namespace: "dev-frank",
            spec: &spec,
            flavor: &flavor,
            default_devserver_image: "devserver:latest",
            static_dependencies_image: "deps:latest",
            owner: owner(),
            persistent_home_claim: None,
            extra_annotations: &extra_annotations,
            extra_labels: &extra_labels,
        });
        assert_eq!(dep.metadata.labels.as_ref().unwrap().get("team").map(String::as_str), Some("platform"));
        assert_eq!(
            dep.metadata.annotations.as_ref().unwrap().get("owner").map(String::as_str),
            Some("alice")
        );
        let selector = dep.spec.as_ref().unwrap().selector.match_labels.as_ref().unwrap();
        assert!(!selector.contains_key("team"));
        assert_eq!(selector.get("app").map(String::as_str), Some("frank"));
    }
}
