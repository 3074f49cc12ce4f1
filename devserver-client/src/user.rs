//! Typed wrapper around the cluster-scoped `DevServerUser` resource.

use devserver_types::DevServerUser;
use futures::Stream;
use kube::{Api, Client};
use serde_json::Value;
use std::time::Duration;

use crate::{Error, gateway};

pub fn api(client: Client) -> Api<DevServerUser> {
    Api::all(client)
}

pub async fn get(client: Client, name: &str) -> Result<Option<DevServerUser>, Error> {
    gateway::get(&api(client), name).await
}

pub async fn list(client: Client) -> Result<Vec<DevServerUser>, Error> {
    gateway::list(&api(client)).await
}

pub async fn create(client: Client, obj: &DevServerUser) -> Result<DevServerUser, Error> {
    gateway::create(&api(client), obj).await
}

pub async fn apply(client: Client, name: &str, obj: &DevServerUser) -> Result<DevServerUser, Error> {
    gateway::apply(&api(client), name, obj).await
}

pub async fn update(client: Client, name: &str, obj: &DevServerUser) -> Result<DevServerUser, Error> {
    gateway::update(&api(client), name, obj).await
}

pub async fn delete(client: Client, name: &str) -> Result<(), Error> {
    gateway::delete(&api(client), name).await
}

pub async fn refresh(client: Client, existing: &mut DevServerUser) -> Result<(), Error> {
    gateway::refresh(&api(client), existing).await
}

pub fn watch(client: Client) -> impl Stream<Item = Result<DevServerUser, Error>> + Send + 'static {
    gateway::watch(&api(client))
}

pub async fn wait_for_status(
    client: Client,
    name: &str,
    subset: Value,
    timeout: Duration,
    on_event: Option<&mut dyn FnMut(&DevServerUser)>,
) -> Result<DevServerUser, Error> {
    crate::wait::wait_for_status(&api(client), name, subset, timeout, on_event).await
}
