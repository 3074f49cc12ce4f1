//! Typed access layer for the DevServer custom resources.
//!
//! This crate is deliberately free of reconciliation business logic: it is
//! the thin layer the operator binary and any out-of-tree tooling (a CLI,
//! an admin UI) would both depend on to read and write DevServer state.

pub mod devserver;
pub mod flavor;
pub mod gateway;
pub mod session;
pub mod user;
pub mod wait;

pub use session::DevServerSession;
pub use wait::wait_for_status;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes reported error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },

    #[error("watch stream error: {source}")]
    Watcher {
        #[from]
        source: kube::runtime::watcher::Error,
    },

    #[error("Json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("timed out waiting for status to match")]
    Timeout,
}
