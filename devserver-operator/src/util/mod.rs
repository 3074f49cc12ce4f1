use std::time::Duration;

pub mod events;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod patch;

pub use devserver_common::colors;

mod error;

pub use error::*;

/// The default interval for requeuing a managed resource once it has
/// settled, so the operator still notices drift even without a watch event.
pub(crate) const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Field manager / owner-reference identity of this operator.
pub(crate) const MANAGER_NAME: &str = "devserver-operator";
