pub mod configmap;
pub mod deployment;
pub mod service;
pub mod volumes;

pub use deployment::{DeploymentInputs, build_deployment};
pub use service::build_ssh_service;

/// Text content of the assets mounted via ConfigMap. Supplied by the
/// operator's config rather than compiled in, so they can be tuned without a
/// rebuild.
pub struct OperatorAssets {
    pub startup_script: String,
    pub login_script: String,
    pub sshd_config: String,
}
