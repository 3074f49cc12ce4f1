pub mod actions;
pub mod reconcile;

pub use reconcile::{ContextData, on_error, reconcile};
