use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

fn default_read_only() -> bool {
    false
}

/// A single volume mount. Used both as a [`DevServerFlavor`]'s baseline
/// volume list and as a [`DevServer`]'s own overlay; the two are merged by
/// `mountPath` with the DevServer's entry winning ties.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct DevServerVolume {
    pub claim_name: String,
    pub mount_path: String,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct SshSpec {
    pub public_key: String,
    /// Opt in to a ClusterIP Service exposing port 22. Off by default; the
    /// canonical access path is port-forward.
    #[serde(default)]
    pub expose_service: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct LifecycleSpec {
    /// Duration string such as `4h`, `30m`, `1h30m`. Absence means the
    /// DevServer is never expired by the TTL controller.
    pub time_to_live: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct PersistentHomeSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Quantity string, e.g. `10Gi`. Only consulted when `enabled` is true.
    pub size: Option<String>,
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "devserver.io",
    version = "v1",
    kind = "DevServer",
    plural = "devservers",
    derive = "PartialEq",
    status = "DevServerStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.flavor\", \"name\": \"FLAVOR\", \"type\": \"string\" }"
)]
pub struct DevServerSpec {
    pub flavor: String,
    pub image: Option<String>,
    pub ssh: SshSpec,
    #[serde(default)]
    pub lifecycle: LifecycleSpec,
    #[serde(default)]
    pub volumes: Vec<DevServerVolume>,
    /// Deprecated alternative to `volumes`: auto-provisions a home PVC.
    pub persistent_home: Option<PersistentHomeSpec>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum DevServerPhase {
    #[default]
    Pending,
    Running,
    Failed,
}

impl FromStr for DevServerPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(DevServerPhase::Pending),
            "Running" => Ok(DevServerPhase::Running),
            "Failed" => Ok(DevServerPhase::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DevServerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevServerPhase::Pending => write!(f, "Pending"),
            DevServerPhase::Running => write!(f, "Running"),
            DevServerPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DevServerStatus {
    pub phase: DevServerPhase,
    pub message: Option<String>,
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "devserver.io",
    version = "v1",
    kind = "DevServerFlavor",
    plural = "devserverflavors",
    derive = "PartialEq",
    status = "DevServerFlavorStatus"
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.default\", \"name\": \"DEFAULT\", \"type\": \"boolean\" }"
)]
pub struct DevServerFlavorSpec {
    #[serde(default)]
    pub resources: ResourceRequirements,
    pub node_selector: Option<BTreeMap<String, String>>,
    pub tolerations: Option<Vec<Toleration>>,
    /// Baseline volumes every DevServer using this flavor starts with;
    /// overlaid (by `mountPath`) by the DevServer's own `spec.volumes`.
    #[serde(default)]
    pub volumes: Vec<DevServerVolume>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DevServerFlavorStatus {
    #[serde(default)]
    pub default: bool,
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "devserver.io",
    version = "v1",
    kind = "DevServerUser",
    plural = "devserverusers",
    derive = "PartialEq",
    status = "DevServerUserStatus"
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.namespace\", \"name\": \"NAMESPACE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
pub struct DevServerUserSpec {
    /// DNS-1123-safe label; enforced by callers (CLI) before creation.
    pub username: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum DevServerUserPhase {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl FromStr for DevServerUserPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(DevServerUserPhase::Pending),
            "Ready" => Ok(DevServerUserPhase::Ready),
            "Failed" => Ok(DevServerUserPhase::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DevServerUserPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevServerUserPhase::Pending => write!(f, "Pending"),
            DevServerUserPhase::Ready => write!(f, "Ready"),
            DevServerUserPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DevServerUserStatus {
    pub phase: DevServerUserPhase,
    /// Computed as `dev-<username>` on first reconcile. Immutable once set.
    pub namespace: Option<String>,
}
