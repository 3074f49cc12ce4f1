use prometheus::{HistogramVec, IntCounterVec, Opts, register_histogram_vec, register_int_counter_vec};

/// Per-kind reconcile counters and read/write-phase histograms, labeled by
/// `(name, namespace)` and, for the action counters/histograms, the action
/// variant's name.
pub struct ControllerMetrics {
    pub reconcile_counter: IntCounterVec,
    pub action_counter: IntCounterVec,
    pub read_histogram: HistogramVec,
    pub write_histogram: HistogramVec,
}

impl ControllerMetrics {
    pub fn new(kind: &str) -> Self {
        let reconcile_counter = register_int_counter_vec!(
            Opts::new(
                format!("devserver_operator_{kind}_reconcile_total"),
                format!("Total number of {kind} reconciliations"),
            ),
            &["name", "namespace"]
        )
        .expect("register reconcile_counter");

        let action_counter = register_int_counter_vec!(
            Opts::new(
                format!("devserver_operator_{kind}_action_total"),
                format!("Total number of {kind} reconcile actions by kind"),
            ),
            &["name", "namespace", "action"]
        )
        .expect("register action_counter");

        let read_histogram = register_histogram_vec!(
            format!("devserver_operator_{kind}_read_phase_seconds"),
            format!("Duration of the {kind} reconciler's read phase"),
            &["name", "namespace", "action"]
        )
        .expect("register read_histogram");

        let write_histogram = register_histogram_vec!(
            format!("devserver_operator_{kind}_write_phase_seconds"),
            format!("Duration of the {kind} reconciler's write phase"),
            &["name", "namespace", "action"]
        )
        .expect("register write_histogram");

        ControllerMetrics {
            reconcile_counter,
            action_counter,
            read_histogram,
            write_histogram,
        }
    }
}
