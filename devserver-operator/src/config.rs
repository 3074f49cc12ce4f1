//! Operator-wide configuration (C10), unifying environment variables, an
//! optional YAML config file, and CLI flags behind a single `clap::Parser`.
//! Grounded on `config.py`'s `OperatorConfig`, generalized from a
//! single-purpose env-var reader into the common three-source pattern.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::builders::OperatorAssets;
use crate::util::Error;

const DEFAULT_STARTUP_SCRIPT: &str = include_str!("../assets/startup.sh");
const DEFAULT_LOGIN_SCRIPT: &str = include_str!("../assets/user_login.sh");
const DEFAULT_SSHD_CONFIG: &str = include_str!("../assets/sshd_config");

/// Config file path assumed when neither `--config` nor
/// `DEVSERVER_OPERATOR_CONFIG_PATH` is given, matching the original's
/// `DEFAULT_CONFIG_PATH`.
const DEFAULT_CONFIG_PATH: &str = "/etc/devserver-operator/config.yaml";

/// Raw CLI/env surface. Anything that also appears in the optional YAML
/// config file is seeded from there first, so an operator-file value acts as
/// a default that env vars and flags can still override.
#[derive(Parser, Debug)]
#[command(name = "devserver-operator", about = "Controller for DevServer remote development environments")]
pub struct OperatorArgs {
    /// Path to an optional YAML file providing defaults for the other options.
    #[arg(long, env = "DEVSERVER_OPERATOR_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// How often (seconds) the expiration sweep runs.
    #[arg(long, env = "DEVSERVER_EXPIRATION_INTERVAL", default_value_t = 60)]
    pub expiration_interval: u64,

    /// How often (seconds) the flavor-default reconciliation sweep runs.
    #[arg(long, env = "DEVSERVER_FLAVOR_RECONCILIATION_INTERVAL", default_value_t = 60)]
    pub flavor_reconciliation_interval: u64,

    /// Max number of concurrent reconciles per controller.
    #[arg(long, env = "DEVSERVER_WORKER_LIMIT", default_value_t = 1)]
    pub worker_limit: usize,

    /// Image used for the main `devserver` container when the flavor and
    /// DevServer spec don't each name one explicitly.
    #[arg(
        long,
        env = "DEVSERVER_DEFAULT_IMAGE",
        default_value = "ghcr.io/devserver/devserver-base:latest"
    )]
    pub default_devserver_image: String,

    /// Image used for the `install-sshd` init container.
    #[arg(
        long,
        env = "DEVSERVER_STATIC_DEPENDENCIES_IMAGE",
        default_value = "ghcr.io/devserver/static-deps:latest"
    )]
    pub static_dependencies_image: String,

    /// Default size for the `persistentHome` PVC when a DevServer enables it
    /// without specifying a size.
    #[arg(long, env = "DEVSERVER_DEFAULT_PERSISTENT_HOME_SIZE", default_value = "10Gi")]
    pub default_persistent_home_size: String,

    /// Health/readiness/metrics HTTP bind address.
    #[arg(long, env = "DEVSERVER_HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub health_addr: String,

    /// Emit a Kubernetes `Event` object on each reconcile outcome. Off by
    /// default to protect the API server from per-event write load.
    #[arg(long, env = "DEVSERVER_POSTING_ENABLED", default_value_t = false)]
    pub posting_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    expiration_interval: Option<u64>,
    flavor_reconciliation_interval: Option<u64>,
    worker_limit: Option<usize>,
    default_devserver_image: Option<String>,
    static_dependencies_image: Option<String>,
    default_persistent_home_size: Option<String>,
    health_addr: Option<String>,
    posting_enabled: Option<bool>,
}

impl FileConfig {
    /// Seeds any env var that isn't already set in the process environment
    /// from the file, so `clap`'s normal env/flag precedence still wins.
    fn seed_env(&self) {
        macro_rules! seed {
            ($field:ident, $env_var:literal) => {
                if std::env::var($env_var).is_err()
                    && let Some(value) = &self.$field
                {
                    unsafe {
                        std::env::set_var($env_var, value.to_string());
                    }
                }
            };
        }
        seed!(expiration_interval, "DEVSERVER_EXPIRATION_INTERVAL");
        seed!(flavor_reconciliation_interval, "DEVSERVER_FLAVOR_RECONCILIATION_INTERVAL");
        seed!(worker_limit, "DEVSERVER_WORKER_LIMIT");
        seed!(default_devserver_image, "DEVSERVER_DEFAULT_IMAGE");
        seed!(static_dependencies_image, "DEVSERVER_STATIC_DEPENDENCIES_IMAGE");
        seed!(default_persistent_home_size, "DEVSERVER_DEFAULT_PERSISTENT_HOME_SIZE");
        seed!(health_addr, "DEVSERVER_HEALTH_ADDR");
        seed!(posting_enabled, "DEVSERVER_POSTING_ENABLED");
    }
}

/// Resolved configuration shared across every reconciler and background task.
pub struct OperatorConfig {
    pub expiration_interval: std::time::Duration,
    pub flavor_reconciliation_interval: std::time::Duration,
    pub worker_limit: usize,
    pub default_devserver_image: String,
    pub static_dependencies_image: String,
    pub default_persistent_home_size: String,
    pub health_addr: String,
    pub posting_enabled: bool,
    pub assets: OperatorAssets,
}

impl OperatorConfig {
    /// Reads the config file's YAML (if one is found) into the process
    /// environment, then parses `OperatorArgs` from env/CLI as usual. A
    /// missing file at the *default* path is not an error — it just means
    /// "use defaults", matching `config.py`'s `FileNotFoundError` handling.
    pub fn load() -> Result<Self, Error> {
        let path = early_config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let file_config: FileConfig = serde_yaml::from_str(&contents)
                    .map_err(|e| Error::UserInput(format!("parsing config file {path:?}: {e}")))?;
                file_config.seed_env();
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                println!("operator config file not found at {path:?}, using default values");
            }
            Err(e) => {
                return Err(Error::UserInput(format!("reading config file {path:?}: {e}")));
            }
        }

        let args = OperatorArgs::parse();
        Ok(OperatorConfig {
            expiration_interval: std::time::Duration::from_secs(args.expiration_interval),
            flavor_reconciliation_interval: std::time::Duration::from_secs(
                args.flavor_reconciliation_interval,
            ),
            worker_limit: args.worker_limit,
            default_devserver_image: args.default_devserver_image,
            static_dependencies_image: args.static_dependencies_image,
            default_persistent_home_size: args.default_persistent_home_size,
            health_addr: args.health_addr,
            posting_enabled: args.posting_enabled,
            assets: OperatorAssets {
                startup_script: DEFAULT_STARTUP_SCRIPT.to_string(),
                login_script: DEFAULT_LOGIN_SCRIPT.to_string(),
                sshd_config: DEFAULT_SSHD_CONFIG.to_string(),
            },
        })
    }
}

/// `clap` only resolves `--config`/`DEVSERVER_OPERATOR_CONFIG_PATH` after the
/// file it names would already need to have been read, so this does a
/// minimal manual scan of argv/env first, falling back to
/// `DEFAULT_CONFIG_PATH` when neither names one explicitly.
fn early_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DEVSERVER_OPERATOR_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let args: Vec<String> = std::env::args().collect();
    let explicit = args.iter().position(|a| a == "--config").and_then(|i| args.get(i + 1)).map(PathBuf::from);
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
