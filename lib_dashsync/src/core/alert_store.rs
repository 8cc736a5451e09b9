//! # Alert Store
//!
//! Reconciles alert events into the set of alerts the dashboard shows.
//!
//! Alerts are identified by their `content` string. The store keeps an ordered
//! internal collection and derives the visible set on every read by filtering to
//! `triggered` entries.
//!
//! ## Lifecycle asymmetry
//! - An event for a **known** alert updates that entry in place, whatever its
//!   `triggered` value. An alert that goes untriggered stays tracked but hidden.
//! - An event for an **unknown** alert is prepended, then the whole collection
//!   is pruned to triggered entries. A first sighting with `triggered = false`
//!   is therefore discarded, and any hidden entries are purged at the same time.
//!
//! This mirrors what the dashboard has always done. It looks accidental but
//! downstream behavior depends on it, so it is kept as is.

use serde::Serialize;

use crate::core::decoder::{AlertEvent, AlertLevel};

/// An alert tracked by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub content: String,
    pub name: AlertLevel,
    pub value: f64,
    pub triggered: bool,
}

impl From<AlertEvent> for Alert {
    fn from(event: AlertEvent) -> Self {
        Self {
            content: event.content,
            name: event.name,
            value: event.value,
            triggered: event.triggered,
        }
    }
}

/// # Alert Store
#[derive(Debug, Default)]
pub struct AlertStore {
    /// Newest first. At most one entry per `content`.
    entries: Vec<Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Ingest
    ///
    /// Applies one alert event.
    ///
    /// ## Logic:
    /// 1.  Look for an entry with the same `content`.
    /// 2.  If found, overwrite `name`, `value` and `triggered` in place; its
    ///     position does not change.
    /// 3.  Otherwise prepend a new entry and drop every untriggered entry from
    ///     the collection.
    pub fn ingest(&mut self, event: AlertEvent) {
        if let Some(existing) = self.entries.iter_mut().find(|a| a.content == event.content) {
            existing.name = event.name;
            existing.value = event.value;
            existing.triggered = event.triggered;
            log::debug!(
                "Alert '{}' updated (triggered: {}, value: {}).",
                existing.content,
                existing.triggered,
                existing.value
            );
            return;
        }

        log::debug!("Alert '{}' first seen (triggered: {}).", event.content, event.triggered);
        self.entries.insert(0, Alert::from(event));
        self.entries.retain(|a| a.triggered);
    }

    /// The alerts currently shown: tracked entries with `triggered = true`,
    /// newest first. Recomputed on every call.
    pub fn visible(&self) -> Vec<Alert> {
        self.entries.iter().filter(|a| a.triggered).cloned().collect()
    }

    /// Looks up a tracked entry, visible or not.
    pub fn tracked(&self, content: &str) -> Option<&Alert> {
        self.entries.iter().find(|a| a.content == content)
    }

    /// Alerts have no timers to cancel; state is left in place for the last render.
    pub fn dispose(&mut self) {
        log::debug!("Alert store disposed with {} tracked alert(s).", self.entries.len());
    }
}
