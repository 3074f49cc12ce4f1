use devserver_common::backoff::backoff_full_jitter;
use devserver_types::DevServer;
use kube::{
    ResourceExt,
    runtime::controller::Action,
    runtime::events::{Event, EventType},
};
use owo_colors::OwoColorize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::Instant,
};
use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::config::OperatorConfig;
use crate::util::{
    Error, PROBE_INTERVAL,
    colors::{FG1, FG2},
    events,
};

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

use super::actions;

const ERROR_BACKOFF_BASE: Duration = Duration::from_secs(1);
const ERROR_BACKOFF_CAP: Duration = Duration::from_secs(30);

pub struct ContextData {
    pub client: kube::Client,
    pub config: Arc<OperatorConfig>,

    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,

    last_action: Mutex<HashMap<(String, String), (DevServerActionKind, Instant)>>,
    /// Consecutive-error count per object, used to jitter-backoff
    /// `on_error`'s requeue delay. Reset to zero on a successful reconcile.
    error_attempts: StdMutex<HashMap<(String, String), u32>>,
}

impl ContextData {
    pub fn new(client: kube::Client, config: Arc<OperatorConfig>) -> Self {
        ContextData {
            client,
            config,
            #[cfg(feature = "metrics")]
            metrics: ControllerMetrics::new("devserver"),
            last_action: Mutex::new(HashMap::new()),
            error_attempts: StdMutex::new(HashMap::new()),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum DevServerActionKind {
    NoOp,
    Failed,
    Reconcile,
}

/// Action to take for a `DevServer` as decided by the read phase.
#[derive(Debug, Clone)]
enum DevServerAction {
    /// Being deleted or otherwise requires no action right now.
    NoOp,
    /// Permanent failure: validation or flavor lookup failed.
    Failed { reason: String },
    /// Ensure host keys, children, and status are up to date. Carries the
    /// already-fetched flavor so the write phase doesn't re-fetch it.
    Reconcile {
        flavor: Box<devserver_types::DevServerFlavorSpec>,
    },
}

impl DevServerAction {
    fn kind(&self) -> DevServerActionKind {
        match self {
            DevServerAction::NoOp => DevServerActionKind::NoOp,
            DevServerAction::Failed { .. } => DevServerActionKind::Failed,
            DevServerAction::Reconcile { .. } => DevServerActionKind::Reconcile,
        }
    }

    fn to_str(&self) -> &'static str {
        match self {
            DevServerAction::NoOp => "NoOp",
            DevServerAction::Failed { .. } => "Failed",
            DevServerAction::Reconcile { .. } => "Reconcile",
        }
    }
}

pub async fn reconcile(instance: Arc<DevServer>, context: Arc<ContextData>) -> Result<Action, Error> {
    let client = context.client.clone();
    let namespace = instance.namespace().ok_or_else(|| {
        Error::UserInput("Expected DevServer to be namespaced.".to_owned())
    })?;
    let name = instance.name_any();

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&name, &namespace])
        .inc();

    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let action = determine_action(client.clone(), &namespace, &instance).await?;

    {
        let mut la = context.last_action.lock().await;
        let value = la.insert((namespace.clone(), name.clone()), (action.kind(), Instant::now()));
        if let Some((last_kind, last_instant)) = value
            && (action.kind() != last_kind || last_instant.elapsed() > Duration::from_secs(300))
        {
            println!(
                "🔧 {}{}{}{}{}",
                namespace.color(FG2),
                "/".color(FG1),
                name.color(FG2),
                " ACTION: ".color(FG1),
                action.to_str().color(FG2),
            );
        }
    }

    #[cfg(feature = "metrics")]
    context
        .metrics
        .read_histogram
        .with_label_values(&[&name, &namespace, action.to_str()])
        .observe(start.elapsed().as_secs_f64());

    #[cfg(feature = "metrics")]
    context
        .metrics
        .action_counter
        .with_label_values(&[&name, &namespace, action.to_str()])
        .inc();

    #[cfg(feature = "metrics")]
    let timer = match &action {
        DevServerAction::NoOp => None,
        _ => Some(
            context
                .metrics
                .write_histogram
                .with_label_values(&[&name, &namespace, action.to_str()])
                .start_timer(),
        ),
    };

    let result = match action {
        DevServerAction::NoOp => Action::await_change(),
        DevServerAction::Failed { reason } => {
            actions::failed(client.clone(), &instance, reason.clone()).await?;
            events::publish(
                client,
                context.config.posting_enabled,
                instance.as_ref(),
                Event {
                    type_: EventType::Warning,
                    reason: "ReconcileFailed".to_string(),
                    note: Some(reason),
                    action: "Reconciling".to_string(),
                    secondary: None,
                },
            )
            .await;
            Action::await_change()
        }
        DevServerAction::Reconcile { flavor } => {
            actions::reconcile_children(
                client.clone(),
                &instance,
                &flavor,
                &context.config.assets,
                &context.config.default_devserver_image,
                &context.config.static_dependencies_image,
                &context.config.default_persistent_home_size,
            )
            .await?;
            events::publish(
                client,
                context.config.posting_enabled,
                instance.as_ref(),
                Event {
                    type_: EventType::Normal,
                    reason: "Reconciled".to_string(),
                    note: Some("host keys, children, and status are up to date".to_string()),
                    action: "Reconciling".to_string(),
                    secondary: None,
                },
            )
            .await;
            Action::requeue(PROBE_INTERVAL)
        }
    };

    #[cfg(feature = "metrics")]
    if let Some(timer) = timer {
        timer.observe_duration();
    }

    // Reaching here means this reconcile didn't propagate an `Err`, so any
    // consecutive-error streak `on_error` was backing off for this object is
    // over.
    context
        .error_attempts
        .lock()
        .unwrap()
        .remove(&(namespace, name));

    Ok(result)
}

async fn determine_action(
    client: kube::Client,
    namespace: &str,
    instance: &DevServer,
) -> Result<DevServerAction, Error> {
    if instance.metadata.deletion_timestamp.is_some() {
        return Ok(DevServerAction::NoOp);
    }

    if let Err(e) = crate::validation::validate_ttl(instance.spec.lifecycle.time_to_live.as_deref()) {
        return permanent_or_propagate(e);
    }
    if let Err(e) = crate::validation::validate_volumes(&instance.spec.volumes) {
        return permanent_or_propagate(e);
    }

    let flavor = devserver_client::flavor::get(client.clone(), &instance.spec.flavor)
        .await
        .map_err(|e| Error::Client { source: e })?;
    let Some(flavor) = flavor else {
        return Ok(DevServerAction::Failed {
            reason: format!(
                "DevServerFlavor '{}' referenced by DevServer '{}' in namespace '{namespace}' was not found",
                instance.spec.flavor,
                instance.name_any(),
            ),
        });
    };

    Ok(DevServerAction::Reconcile {
        flavor: Box::new(flavor.spec),
    })
}

fn permanent_or_propagate(e: Error) -> Result<DevServerAction, Error> {
    if e.is_permanent() {
        Ok(DevServerAction::Failed {
            reason: e.to_string(),
        })
    } else {
        Err(e)
    }
}

pub fn on_error(instance: Arc<DevServer>, error: &Error, context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!(
            "Reconciliation error for DevServer '{}': {:?}",
            instance.name_any(),
            error
        )
        .red()
    );

    let key = (
        instance.namespace().unwrap_or_default(),
        instance.name_any(),
    );
    let attempt = {
        let mut attempts = context.error_attempts.lock().unwrap();
        let count = attempts.entry(key).or_insert(0);
        let attempt = *count;
        *count = count.saturating_add(1);
        attempt
    };
    let delay = backoff_full_jitter(ERROR_BACKOFF_BASE, ERROR_BACKOFF_CAP, attempt as usize);

    if context.config.posting_enabled {
        let client = context.client.clone();
        let note = error.to_string();
        tokio::spawn(async move {
            events::publish(
                client,
                true,
                instance.as_ref(),
                Event {
                    type_: EventType::Warning,
                    reason: "ReconcileError".to_string(),
                    note: Some(note),
                    action: "Reconciling".to_string(),
                    secondary: None,
                },
            )
            .await;
        });
    }
    Action::requeue(delay)
}
