//! Lifecycle classification and action gating for supervisor status snapshots.
//!
//! The supervisor reports a service as a list of named facets. The `Active` facet carries the
//! lifecycle phase as plain text (`"Running 2h"`, `"Starting"`, `"Stopped"`, ...). The text
//! format is owned by the daemon, so matching stays on the literal prefix and tokens.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::DeckError;

pub const ACTIVE_FACET: &str = "Active";

const RUNNING_PREFIX: &str = "Running";
const STARTING_TOKEN: &str = "Starting";
const STOPPING_TOKEN: &str = "Stopping";

/// One named status fact about a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    #[serde(default, deserialize_with = "status_text")]
    pub status: String,
}

#[cfg(test)]
impl StatusEntry {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }
}

/// The daemon sends facet values as whatever JSON scalar it had at hand (PIDs arrive as
/// numbers), so everything is folded into display text.
fn status_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Facets in the order the status source delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSnapshot {
    entries: Vec<StatusEntry>,
}

impl StatusSnapshot {
    pub fn new(entries: Vec<StatusEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(raw: &str) -> Result<Self, DeckError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The authoritative lifecycle facet. If the source ever sends two, the first wins.
    pub fn active(&self) -> Option<&StatusEntry> {
        self.entries.iter().find(|entry| entry.name == ACTIVE_FACET)
    }

    /// Display rows keyed by facet name.
    pub fn rows(&self) -> Vec<StatusRow> {
        self.entries
            .iter()
            .map(|entry| {
                let phase = (entry.name == ACTIVE_FACET).then(|| classify_text(&entry.status));
                StatusRow {
                    key: entry.name.clone(),
                    value: match &phase {
                        Some(phase) => phase.detail().unwrap_or_default().to_string(),
                        None => entry.status.clone(),
                    },
                    phase,
                    terminal: entry.name.eq_ignore_ascii_case("command"),
                }
            })
            .collect()
    }
}

impl From<Vec<StatusEntry>> for StatusSnapshot {
    fn from(entries: Vec<StatusEntry>) -> Self {
        Self::new(entries)
    }
}

/// A facet prepared for rendering. `terminal` marks values that read best in a monospaced,
/// console-styled cell (the command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub key: String,
    pub value: String,
    pub phase: Option<LifecyclePhase>,
    pub terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    Running(String),
    Starting,
    Stopping,
    Stopped(String),
    /// No `Active` facet was reported, either because nothing has arrived yet or because the
    /// daemon did not include it.
    Unknown,
}

impl LifecyclePhase {
    pub fn label(&self) -> &'static str {
        match self {
            LifecyclePhase::Running(_) => "Running",
            LifecyclePhase::Starting => "Starting",
            LifecyclePhase::Stopping => "Stopping",
            LifecyclePhase::Stopped(_) => "Stopped",
            LifecyclePhase::Unknown => "Unknown",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            LifecyclePhase::Running(detail) | LifecyclePhase::Stopped(detail) => {
                Some(detail.as_str())
            }
            _ => None,
        }
    }

    /// A transition is already underway; the view shows a spinner instead of controls.
    pub fn is_transitional(&self) -> bool {
        matches!(self, LifecyclePhase::Starting | LifecyclePhase::Stopping)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, LifecyclePhase::Running(_))
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedActions(BTreeSet<ServiceAction>);

impl AllowedActions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, action: ServiceAction) -> bool {
        self.0.contains(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ServiceAction> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ServiceAction> for AllowedActions {
    fn from_iter<I: IntoIterator<Item = ServiceAction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AllowedActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("-");
        }
        let names = self.iter().map(|action| action.to_string()).collect::<Vec<_>>();
        f.write_str(&names.join(", "))
    }
}

pub fn classify(snapshot: &StatusSnapshot) -> LifecyclePhase {
    try_classify(snapshot).unwrap_or(LifecyclePhase::Unknown)
}

/// Same as [`classify`], but reports a missing `Active` facet instead of folding it into
/// [`LifecyclePhase::Unknown`].
pub fn try_classify(snapshot: &StatusSnapshot) -> Result<LifecyclePhase, DeckError> {
    snapshot
        .active()
        .map(|entry| classify_text(&entry.status))
        .ok_or(DeckError::ClassificationAmbiguous)
}

pub fn classify_text(text: &str) -> LifecyclePhase {
    if let Some(rest) = text.strip_prefix(RUNNING_PREFIX) {
        return LifecyclePhase::Running(rest.trim_start().to_string());
    }
    match text {
        STARTING_TOKEN => LifecyclePhase::Starting,
        STOPPING_TOKEN => LifecyclePhase::Stopping,
        other => LifecyclePhase::Stopped(other.to_string()),
    }
}

pub fn allowed_actions(phase: &LifecyclePhase) -> AllowedActions {
    match phase {
        LifecyclePhase::Running(_) => [ServiceAction::Stop, ServiceAction::Restart]
            .into_iter()
            .collect(),
        LifecyclePhase::Stopped(_) => [ServiceAction::Start].into_iter().collect(),
        LifecyclePhase::Starting | LifecyclePhase::Stopping | LifecyclePhase::Unknown => {
            AllowedActions::none()
        }
    }
}
