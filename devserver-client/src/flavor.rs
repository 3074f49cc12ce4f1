//! Typed wrapper around the cluster-scoped `DevServerFlavor` resource.

use devserver_types::DevServerFlavor;
use futures::Stream;
use kube::{Api, Client};
use serde_json::Value;
use std::time::Duration;

use crate::{Error, gateway};

pub fn api(client: Client) -> Api<DevServerFlavor> {
    Api::all(client)
}

pub async fn get(client: Client, name: &str) -> Result<Option<DevServerFlavor>, Error> {
    gateway::get(&api(client), name).await
}

pub async fn list(client: Client) -> Result<Vec<DevServerFlavor>, Error> {
    gateway::list(&api(client)).await
}

pub async fn create(client: Client, obj: &DevServerFlavor) -> Result<DevServerFlavor, Error> {
    gateway::create(&api(client), obj).await
}

pub async fn apply(
    client: Client,
    name: &str,
    obj: &DevServerFlavor,
) -> Result<DevServerFlavor, Error> {
    gateway::apply(&api(client), name, obj).await
}

pub async fn update(client: Client, name: &str, obj: &DevServerFlavor) -> Result<DevServerFlavor, Error> {
    gateway::update(&api(client), name, obj).await
}

pub async fn delete(client: Client, name: &str) -> Result<(), Error> {
    gateway::delete(&api(client), name).await
}

pub async fn refresh(client: Client, existing: &mut DevServerFlavor) -> Result<(), Error> {
    gateway::refresh(&api(client), existing).await
}

pub fn watch(client: Client) -> impl Stream<Item = Result<DevServerFlavor, Error>> + Send + 'static {
    gateway::watch(&api(client))
}

pub async fn wait_for_status(
    client: Client,
    name: &str,
    subset: Value,
    timeout: Duration,
    on_event: Option<&mut dyn FnMut(&DevServerFlavor)>,
) -> Result<DevServerFlavor, Error> {
    crate::wait::wait_for_status(&api(client), name, subset, timeout, on_event).await
}
