//! Typed wrapper around the namespaced `DevServer` resource.

use devserver_types::DevServer;
use futures::Stream;
use kube::{Api, Client};
use serde_json::Value;
use std::time::Duration;

use crate::{Error, gateway};

pub fn api(client: Client, namespace: &str) -> Api<DevServer> {
    Api::namespaced(client, namespace)
}

pub async fn get(client: Client, namespace: &str, name: &str) -> Result<Option<DevServer>, Error> {
    gateway::get(&api(client, namespace), name).await
}

pub async fn list(client: Client, namespace: &str) -> Result<Vec<DevServer>, Error> {
    gateway::list(&api(client, namespace)).await
}

pub async fn list_all(client: Client) -> Result<Vec<DevServer>, Error> {
    gateway::list(&Api::<DevServer>::all(client)).await
}

pub async fn create(client: Client, namespace: &str, obj: &DevServer) -> Result<DevServer, Error> {
    gateway::create(&api(client, namespace), obj).await
}

pub async fn apply(
    client: Client,
    namespace: &str,
    name: &str,
    obj: &DevServer,
) -> Result<DevServer, Error> {
    gateway::apply(&api(client, namespace), name, obj).await
}

pub async fn update(
    client: Client,
    namespace: &str,
    name: &str,
    obj: &DevServer,
) -> Result<DevServer, Error> {
    gateway::update(&api(client, namespace), name, obj).await
}

pub async fn delete(client: Client, namespace: &str, name: &str) -> Result<(), Error> {
    gateway::delete(&api(client, namespace), name).await
}

pub async fn refresh(client: Client, namespace: &str, existing: &mut DevServer) -> Result<(), Error> {
    gateway::refresh(&api(client, namespace), existing).await
}

pub fn watch(client: Client, namespace: &str) -> impl Stream<Item = Result<DevServer, Error>> + Send + 'static {
    gateway::watch(&api(client, namespace))
}

pub async fn wait_for_status(
    client: Client,
    namespace: &str,
    name: &str,
    subset: Value,
    timeout: Duration,
    on_event: Option<&mut dyn FnMut(&DevServer)>,
) -> Result<DevServer, Error> {
    crate::wait::wait_for_status(&api(client, namespace), name, subset, timeout, on_event).await
}
