//! Generic CRUD helpers shared by the three typed wrapper modules (C1).
//!
//! These exist so that "not found" and "already exists" races are handled
//! the same way everywhere instead of each caller re-deriving the 404/409
//! match arms.

use futures::{Stream, StreamExt};
use kube::{
    Api, Resource,
    api::{DeleteParams, Patch, PatchParams, PostParams},
    runtime::{WatchStreamExt, watcher},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::Error;

/// Field manager used for server-side apply across the whole client.
pub const FIELD_MANAGER: &str = "devserver-operator";

pub async fn get<K>(api: &Api<K>, name: &str) -> Result<Option<K>, Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.get(name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn list<K>(api: &Api<K>) -> Result<Vec<K>, Error>
where
    K: Clone + DeserializeOwned + Debug + Resource,
{
    Ok(api.list(&Default::default()).await?.items)
}

pub async fn create<K>(api: &Api<K>, obj: &K) -> Result<K, Error>
where
    K: Serialize + Clone + DeserializeOwned + Debug,
{
    Ok(api.create(&PostParams::default(), obj).await?)
}

/// Full-replace (`PUT`) write, as opposed to [`apply`]'s server-side-apply
/// patch. `obj` must carry the current `resourceVersion` (typically from a
/// prior [`get`] or [`refresh`]) or the API server rejects it as a conflict.
pub async fn update<K>(api: &Api<K>, name: &str, obj: &K) -> Result<K, Error>
where
    K: Serialize + Clone + DeserializeOwned + Debug,
{
    Ok(api.replace(name, &PostParams::default(), obj).await?)
}

/// Server-side apply, the default write path for reconciled children.
pub async fn apply<K>(api: &Api<K>, name: &str, obj: &K) -> Result<K, Error>
where
    K: Serialize + Clone + DeserializeOwned + Debug,
{
    let patch = Patch::Apply(obj);
    Ok(api
        .patch(name, &PatchParams::apply(FIELD_MANAGER), &patch)
        .await?)
}

pub async fn delete<K>(api: &Api<K>, name: &str) -> Result<(), Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Re-reads `existing`'s object by name and overwrites it in place, so a
/// caller holding a possibly-stale value (e.g. across a long-running
/// operation) can bring it back up to date without juggling a second
/// binding.
pub async fn refresh<K>(api: &Api<K>, existing: &mut K) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let name = existing.meta().name.clone().expect("object must have a name to refresh");
    *existing = api.get(&name).await?;
    Ok(())
}

/// Standalone watch of every event for this kind (not scoped to one named
/// object, unlike [`crate::wait::wait_for_status`]'s field-selector watch).
/// Returns the raw applied-object stream; callers fold it the way they need
/// (a one-shot consumer, a long-lived cache, ...).
pub fn watch<K>(api: &Api<K>) -> impl Stream<Item = Result<K, Error>> + Send + 'static
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    watcher(api.clone(), watcher::Config::default())
        .applied_objects()
        .map(|r| r.map_err(Error::from))
}
