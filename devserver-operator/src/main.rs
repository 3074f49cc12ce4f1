use futures::stream::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client, Config, runtime::Controller, runtime::controller::Config as ControllerConfig};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod builders;
mod config;
mod devserver;
mod expiration;
mod flavor;
mod hostkeys;
mod persistent_home;
mod user;
mod util;
mod validation;

use devserver_types::{DevServer, DevServerUser};

#[tokio::main]
async fn main() {
    devserver_common::init();

    let client = match build_client().await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", format!("failed to build Kubernetes client: {e}").red());
            std::process::exit(1);
        }
    };

    let operator_config = match config::OperatorConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{}", format!("failed to load operator configuration: {e}").red());
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        devserver_common::shutdown::shutdown_signal().await;
        shutdown_signal.cancel();
    });

    let health_addr = operator_config
        .health_addr
        .parse()
        .expect("DEVSERVER_HEALTH_ADDR must be a valid socket address");
    tokio::spawn(devserver_common::health::serve(health_addr, shutdown.clone()));

    tokio::spawn(flavor::run(
        client.clone(),
        operator_config.flavor_reconciliation_interval,
        shutdown.clone(),
    ));
    tokio::spawn(expiration::run(
        client.clone(),
        operator_config.expiration_interval,
        shutdown.clone(),
    ));

    devserver_common::signal_ready();
    run_controllers(client, operator_config, shutdown).await;
}

async fn build_client() -> anyhow::Result<Client> {
    let config = match Config::incluster() {
        Ok(config) => config,
        Err(_) => Config::infer().await?,
    };
    Ok(Client::try_from(config)?)
}

/// Runs the `DevServer` and `DevServerUser` watch-driven controllers until
/// `shutdown` is cancelled. A single operator replica is assumed (no leader
/// election: this is a single-instance control plane by design, not a
/// stopgap), so both controllers start unconditionally at boot.
async fn run_controllers(client: Client, operator_config: Arc<config::OperatorConfig>, shutdown: CancellationToken) {
    println!("{}", "🌱 Starting devserver-operator...".green());

    let worker_limit = operator_config.worker_limit;
    let devserver_context = Arc::new(devserver::ContextData::new(client.clone(), operator_config.clone()));
    let user_context = Arc::new(user::ContextData::new(client.clone(), operator_config.posting_enabled));

    let devserver_task = spawn_devserver_controller(client.clone(), devserver_context, worker_limit);
    let user_task = spawn_user_controller(client, user_context, worker_limit);

    shutdown.cancelled().await;
    devserver_task.abort();
    user_task.abort();
    devserver_task.await.ok();
    user_task.await.ok();
}

fn spawn_devserver_controller(
    client: Client,
    context: Arc<devserver::ContextData>,
    worker_limit: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        println!("{}", "🚀 DevServer controller started.".green());
        let api: Api<DevServer> = Api::all(client.clone());
        Controller::new(api, Default::default())
            .owns(Api::<Deployment>::all(client.clone()), Default::default())
            .owns(Api::<ConfigMap>::all(client.clone()), Default::default())
            .owns(Api::<Secret>::all(client), Default::default())
            .with_config(ControllerConfig::default().concurrency(worker_limit as u16))
            .run(devserver::reconcile, devserver::on_error, context)
            .for_each(|_res| async move {})
            .await;
    })
}

fn spawn_user_controller(
    client: Client,
    context: Arc<user::ContextData>,
    worker_limit: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        println!("{}", "🚀 DevServerUser controller started.".green());
        let api: Api<DevServerUser> = Api::all(client);
        Controller::new(api, Default::default())
            .with_config(ControllerConfig::default().concurrency(worker_limit as u16))
            .run(user::reconcile, user::on_error, context)
            .for_each(|_res| async move {})
            .await;
    })
}
