//! The view-model behind one displayed service: its latest status snapshot, the lifecycle
//! actions it currently offers, and its settings form.

use anyhow::Result;
use tracing::{info, warn};

use crate::backend::ControlPlane;
use crate::errors::DeckError;
use crate::form::{CommitStatus, SettingsForm};
use crate::settings::SettingsList;
use crate::status::{
    allowed_actions, classify, AllowedActions, LifecyclePhase, ServiceAction, StatusRow,
    StatusSnapshot,
};

/// Proof that a lifecycle request was admitted; hand it back with the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTicket {
    pub action: ServiceAction,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct ServicePanel {
    service: String,
    snapshot: StatusSnapshot,
    phase: LifecyclePhase,
    form: SettingsForm,
    pending_action: Option<ActionTicket>,
    action_seq: u64,
    last_action_error: Option<String>,
}

impl ServicePanel {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            form: SettingsForm::new(service.clone(), Vec::new()),
            service,
            snapshot: StatusSnapshot::default(),
            phase: LifecyclePhase::Unknown,
            pending_action: None,
            action_seq: 0,
            last_action_error: None,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn phase(&self) -> &LifecyclePhase {
        &self.phase
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn status_rows(&self) -> Vec<StatusRow> {
        self.snapshot.rows()
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    pub fn pending_action(&self) -> Option<ServiceAction> {
        self.pending_action.map(|ticket| ticket.action)
    }

    pub fn last_action_error(&self) -> Option<&str> {
        self.last_action_error.as_deref()
    }

    /// Actions to offer right now: what the phase permits, or nothing while a request is out.
    pub fn available_actions(&self) -> AllowedActions {
        if self.pending_action.is_some() {
            return AllowedActions::none();
        }
        allowed_actions(&self.phase)
    }

    /// Replaces the status snapshot. Settings sessions are left alone.
    pub fn apply_snapshot(&mut self, snapshot: StatusSnapshot) {
        self.phase = classify(&snapshot);
        self.snapshot = snapshot;
    }

    pub fn load_settings(&mut self, fields: SettingsList) {
        self.form.reload(fields);
    }

    pub fn request_action(&mut self, action: ServiceAction) -> Result<ActionTicket, DeckError> {
        if let Some(pending) = self.pending_action {
            return Err(DeckError::RequestInFlight(format!(
                "{} {}",
                pending.action, self.service
            )));
        }
        if !allowed_actions(&self.phase).contains(action) {
            return Err(DeckError::ActionNotAllowed {
                action,
                phase: self.phase.clone(),
            });
        }

        self.action_seq += 1;
        let ticket = ActionTicket {
            action,
            seq: self.action_seq,
        };
        self.pending_action = Some(ticket);
        self.last_action_error = None;
        Ok(ticket)
    }

    /// Records the lifecycle sink's answer. Returns `false` for a ticket this panel is not
    /// waiting on. The phase only changes with the next snapshot.
    pub fn finish_action(&mut self, ticket: ActionTicket, outcome: Result<(), String>) -> bool {
        if self.pending_action != Some(ticket) {
            return false;
        }
        self.pending_action = None;
        if let Err(reason) = outcome {
            self.last_action_error = Some(reason);
        }
        true
    }

    pub async fn refresh_status<C: ControlPlane>(&mut self, plane: &C) -> Result<()> {
        let snapshot = plane.status(&self.service).await?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    pub async fn refresh_settings<C: ControlPlane>(&mut self, plane: &C) -> Result<()> {
        let fields = plane.settings(&self.service).await?;
        self.load_settings(fields);
        Ok(())
    }

    /// Runs a gated lifecycle action against the supervisor.
    pub async fn run_action<C: ControlPlane>(
        &mut self,
        plane: &C,
        action: ServiceAction,
    ) -> Result<(), DeckError> {
        let ticket = self.request_action(action)?;
        let outcome = plane
            .perform(&self.service, action)
            .await
            .map_err(|err| format!("{err:#}"));
        self.finish_action(ticket, outcome.clone());

        match outcome {
            Ok(()) => {
                info!(service = %self.service, %action, "lifecycle request accepted");
                Ok(())
            }
            Err(reason) => {
                warn!(service = %self.service, %action, "lifecycle request failed: {reason}");
                Err(DeckError::RequestFailure { reason })
            }
        }
    }

    /// Saves one field if it has unsaved changes. `Ok(false)` means there was nothing to save.
    pub async fn save_field<C: ControlPlane>(
        &mut self,
        plane: &C,
        name: &str,
    ) -> Result<bool, DeckError> {
        let Some(request) = self.form.commit(name)? else {
            return Ok(false);
        };

        let outcome = plane
            .save(&request.service, &request.field, &request.value)
            .await
            .map_err(|err| format!("{err:#}"));

        match self.form.complete_commit(&request, outcome.clone()) {
            CommitStatus::Saved => {
                info!(service = %self.service, field = %name, "setting saved");
                Ok(true)
            }
            CommitStatus::Failed => Err(DeckError::RequestFailure {
                reason: outcome.err().unwrap_or_default(),
            }),
            CommitStatus::Stale => Ok(false),
        }
    }
}
