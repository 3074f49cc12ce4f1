use devserver_common::backoff::backoff_full_jitter;
use devserver_types::DevServerUser;
use kube::{
    ResourceExt,
    runtime::controller::Action,
    runtime::events::{Event, EventType},
};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::time::Duration;

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
    pub posting_enabled: bool,

    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,

    /// Consecutive-error count per object, used to jitter-backoff
    /// `on_error`'s requeue delay. Reset to zero on a successful reconcile.
    error_attempts: StdMutex<HashMap<String, u32>>,
}

impl ContextData {
    pub fn new(client: kube::Client, posting_enabled: bool) -> Self {
        ContextData {
            client,
            posting_enabled,
            #[cfg(feature = "metrics")]
            metrics: ControllerMetrics::new("devserveruser"),
            error_attempts: StdMutex::new(HashMap::new()),
        }
    }
}

pub async fn reconcile(instance: Arc<DevServerUser>, context: Arc<ContextData>) -> Result<Action, Error> {
    let client = context.client.clone();
    let name = instance.name_any();

    if instance.metadata.deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&name, ""])
        .inc();

    #[cfg(feature = "metrics")]
    let timer = context
        .metrics
        .write_histogram
        .with_label_values(&[&name, "", "Reconcile"])
        .start_timer();

    println!(
        "🔧 {}{}",
        name.color(FG2),
        " reconciling namespace, service account, role, and role binding".color(FG1),
    );

    let result = actions::reconcile_children(client.clone(), &instance).await;

    #[cfg(feature = "metrics")]
    timer.observe_duration();

    if let Err(e) = result {
        if e.is_permanent() {
            let reason = e.to_string();
            actions::failed(client.clone(), &instance, reason.clone()).await?;
            events::publish(
                client,
                context.posting_enabled,
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
            context.error_attempts.lock().unwrap().remove(&name);
            return Ok(Action::await_change());
        }
        return Err(e);
    }

    events::publish(
        client,
        context.posting_enabled,
        instance.as_ref(),
        Event {
            type_: EventType::Normal,
            reason: "Reconciled".to_string(),
            note: Some("namespace, service account, role, and role binding are up to date".to_string()),
            action: "Reconciling".to_string(),
            secondary: None,
        },
    )
    .await;

    // Reaching here means this reconcile didn't propagate an `Err`, so any
    // consecutive-error streak `on_error` was backing off for this object is
    // over.
    context.error_attempts.lock().unwrap().remove(&name);

    Ok(Action::requeue(PROBE_INTERVAL))
}

pub fn on_error(instance: Arc<DevServerUser>, error: &Error, context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!(
            "Reconciliation error for DevServerUser '{}': {:?}",
            instance.name_any(),
            error
        )
        .red()
    );

    let name = instance.name_any();
    let attempt = {
        let mut attempts = context.error_attempts.lock().unwrap();
        let count = attempts.entry(name).or_insert(0);
        let attempt = *count;
        *count = count.saturating_add(1);
        attempt
    };
    let delay = backoff_full_jitter(ERROR_BACKOFF_BASE, ERROR_BACKOFF_CAP, attempt as usize);

    if context.posting_enabled {
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
