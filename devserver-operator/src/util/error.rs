#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes reported error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },

    #[error("client error: {source}")]
    Client {
        #[from]
        source: devserver_client::Error,
    },

    /// Permanent failure: the user's spec is invalid and retrying without a
    /// spec change will never succeed.
    #[error("invalid user input: {0}")]
    UserInput(String),

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("ssh host key generation failed: {0}")]
    SshKeygen(String),

    /// Permanent failure: a `wait_for_status` caller gave up.
    #[error("timed out waiting for status")]
    Timeout,
}

impl Error {
    /// Whether this failure is permanent (no amount of retrying without a
    /// spec change will fix it) as opposed to transient (API server hiccup,
    /// worth the controller's default backoff-and-retry).
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::UserInput(_) | Error::Timeout)
    }
}
