pub mod backoff;
pub mod colors;
pub mod health;
pub mod shutdown;

/// Drops a readiness marker file for orchestrators that check for it
/// instead of (or alongside) a `/readyz` HTTP probe.
pub fn signal_ready() {
    std::fs::write("/etc/ready", "ready").expect("Failed to write readiness file");
}

pub fn init() {
    let disable_colors = ["1", "true"].contains(
        &std::env::var("DISABLE_COLORS")
            .unwrap_or_else(|_| String::new())
            .to_lowercase()
            .as_str(),
    );
    owo_colors::set_override(!disable_colors);

    install_rustls_provider();
}

/// `kube`'s `rustls-tls` feature needs a process-wide default crypto
/// provider installed before the first TLS connection is made.
pub fn install_rustls_provider() {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("install aws-lc-rs provider");
}
