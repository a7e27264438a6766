//! Per-field edit sessions for a service's settings.
//!
//! Each field gets its own [`FormSession`] holding the committed baseline and the operator's
//! working value. Sessions are independent: saving or discarding one never touches another.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::errors::DeckError;
use crate::settings::{
    declared_kind, resolve_kind, validate, values_match, FieldKind, SettingField, SettingValue,
    SettingsList,
};

/// Identifies one save request. A response is only applied to the session that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub service: String,
    pub field: String,
    pub value: SettingValue,
    pub ticket: Ticket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Dirty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Saved,
    Failed,
    /// The response belongs to a request this session no longer waits for.
    Stale,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct InFlight {
    ticket: Ticket,
    value: SettingValue,
    /// The operator threw away their edit after this request went out.
    discarded: bool,
}

#[derive(Debug, Clone)]
pub struct FormSession {
    service: String,
    field: SettingField,
    kind: FieldKind,
    misconfigured: Option<String>,
    baseline: Option<SettingValue>,
    working: Option<SettingValue>,
    dirty: bool,
    generation: u64,
    next_seq: u64,
    in_flight: Option<InFlight>,
    last_error: Option<String>,
}

impl FormSession {
    pub fn new(service: impl Into<String>, field: SettingField) -> Self {
        let service = service.into();
        let misconfigured = match resolve_kind(&field) {
            Ok(_) => None,
            Err(DeckError::Configuration { reason, .. }) => Some(reason),
            Err(other) => Some(other.to_string()),
        };
        if let Some(reason) = misconfigured.as_deref() {
            warn!(service = %service, field = %field.name, "{reason}");
        }
        Self {
            kind: declared_kind(&field),
            misconfigured,
            baseline: field.value.clone(),
            working: field.value.clone(),
            dirty: false,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            next_seq: 0,
            in_flight: None,
            last_error: None,
            service,
            field,
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn field(&self) -> &SettingField {
        &self.field
    }

    /// The control this field renders with. Misconfigured fields still report their declared
    /// kind so they can be drawn, disabled.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.misconfigured.is_none()
    }

    pub fn configuration_error(&self) -> Option<DeckError> {
        self.misconfigured
            .as_ref()
            .map(|reason| DeckError::Configuration {
                field: self.field.name.clone(),
                reason: reason.clone(),
            })
    }

    pub fn baseline(&self) -> Option<&SettingValue> {
        self.baseline.as_ref()
    }

    pub fn working(&self) -> Option<&SettingValue> {
        self.working.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> SessionState {
        if self.dirty {
            SessionState::Dirty
        } else {
            SessionState::Clean
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The last validation or save failure, kept until the next successful save or discard.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_enabled(&self) -> Result<(), DeckError> {
        match self.configuration_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn edit(&mut self, value: Option<SettingValue>) -> Result<(), DeckError> {
        self.ensure_enabled()?;
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.discarded = false;
        }
        self.working = value;
        self.dirty = !values_match(self.kind, self.working.as_ref(), self.baseline.as_ref());
        Ok(())
    }

    /// Starts saving the working value. Returns `Ok(None)` when there is nothing to save.
    pub fn commit(&mut self) -> Result<Option<CommitRequest>, DeckError> {
        self.ensure_enabled()?;
        if !self.dirty {
            return Ok(None);
        }
        if self.in_flight.is_some() {
            return Err(DeckError::RequestInFlight(self.field.name.clone()));
        }

        if let Err(err) = validate(&self.field, self.kind, self.working.as_ref()) {
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        let value = match (&self.working, self.kind) {
            (Some(value), _) => value.clone(),
            (None, FieldKind::MultiSelect) => SettingValue::Selection(Vec::new()),
            (None, _) => {
                return Err(DeckError::Validation {
                    field: self.field.name.clone(),
                    reason: "a value is required".to_string(),
                })
            }
        };
        self.next_seq += 1;
        let ticket = Ticket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.in_flight = Some(InFlight {
            ticket,
            value: value.clone(),
            discarded: false,
        });
        debug!(service = %self.service, field = %self.field.name, "save requested");

        Ok(Some(CommitRequest {
            service: self.service.clone(),
            field: self.field.name.clone(),
            value,
            ticket,
        }))
    }

    /// Applies the settings sink's answer to an earlier [`commit`](Self::commit).
    pub fn complete_commit(&mut self, ticket: Ticket, outcome: Result<(), String>) -> CommitStatus {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            other => {
                self.in_flight = other;
                debug!(field = %self.field.name, "ignoring stale save response");
                return CommitStatus::Stale;
            }
        };

        match outcome {
            Ok(()) => {
                self.baseline = Some(in_flight.value);
                self.field.value = self.baseline.clone();
                // A discarded edit has nothing left to compare against; show what was saved.
                if in_flight.discarded {
                    self.working = self.baseline.clone();
                }
                self.dirty =
                    !values_match(self.kind, self.working.as_ref(), self.baseline.as_ref());
                self.last_error = None;
                CommitStatus::Saved
            }
            Err(reason) => {
                warn!(service = %self.service, field = %self.field.name, "save failed: {reason}");
                self.last_error = Some(reason);
                CommitStatus::Failed
            }
        }
    }

    /// Reverts to the baseline. With a save outstanding, the session follows whatever that save
    /// ends up committing.
    pub fn discard(&mut self) {
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.discarded = true;
        }
        self.working = self.baseline.clone();
        self.dirty = false;
        self.last_error = None;
    }

    fn has_unsaved_work(&self) -> bool {
        self.dirty || self.in_flight.is_some()
    }
}

/// The editable settings of one service, one session per field, in source order.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    service: String,
    sessions: Vec<FormSession>,
}

impl SettingsForm {
    pub fn new(service: impl Into<String>, fields: SettingsList) -> Self {
        let mut form = Self {
            service: service.into(),
            sessions: Vec::new(),
        };
        form.reload(fields);
        form
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn sessions(&self) -> &[FormSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, name: &str) -> Option<&FormSession> {
        self.sessions.iter().find(|session| session.name() == name)
    }

    fn session_mut(&mut self, name: &str) -> Result<&mut FormSession, DeckError> {
        self.sessions
            .iter_mut()
            .find(|session| session.name() == name)
            .ok_or_else(|| DeckError::UnknownField(name.to_string()))
    }

    pub fn edit(&mut self, name: &str, value: Option<SettingValue>) -> Result<(), DeckError> {
        self.session_mut(name)?.edit(value)
    }

    pub fn commit(&mut self, name: &str) -> Result<Option<CommitRequest>, DeckError> {
        self.session_mut(name)?.commit()
    }

    pub fn complete_commit(
        &mut self,
        request: &CommitRequest,
        outcome: Result<(), String>,
    ) -> CommitStatus {
        if request.service != self.service {
            return CommitStatus::Stale;
        }
        match self.session_mut(&request.field) {
            Ok(session) => session.complete_commit(request.ticket, outcome),
            Err(_) => CommitStatus::Stale,
        }
    }

    pub fn discard(&mut self, name: &str) -> Result<(), DeckError> {
        self.session_mut(name)?.discard();
        Ok(())
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.sessions
            .iter()
            .filter(|session| session.is_dirty())
            .map(FormSession::name)
    }

    pub fn configuration_errors(&self) -> Vec<DeckError> {
        self.sessions
            .iter()
            .filter_map(FormSession::configuration_error)
            .collect()
    }

    /// Replaces the field list. Sessions with unsaved edits or an outstanding save survive
    /// as they are; every other field starts a fresh session from the new descriptor.
    pub fn reload(&mut self, fields: SettingsList) {
        let mut previous = std::mem::take(&mut self.sessions);
        for field in fields {
            if self.sessions.iter().any(|session| session.name() == field.name) {
                warn!(service = %self.service, field = %field.name, "duplicate setting ignored");
                continue;
            }

            let kept = previous
                .iter()
                .position(|session| session.name() == field.name && session.has_unsaved_work())
                .map(|idx| previous.swap_remove(idx));
            let session =
                kept.unwrap_or_else(|| FormSession::new(self.service.clone(), field));
            self.sessions.push(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommitStatus, FormSession, SessionState, SettingsForm};
    use crate::errors::DeckError;
    use crate::settings::{FieldKind, SelectOption, SettingField, SettingValue};

    fn text_field(name: &str, value: &str) -> SettingField {
        SettingField::new(name, Some(SettingValue::text(value)))
    }

    fn toggle_field(name: &str, value: bool) -> SettingField {
        let mut field = SettingField::new(name, Some(SettingValue::Bool(value)));
        field.activable = true;
        field
    }

    fn multi_field(name: &str, selected: &[&str]) -> SettingField {
        let mut field = SettingField::new(
            name,
            Some(SettingValue::selection(selected.iter().copied())),
        );
        field.multi = true;
        field.initial_values = vec![
            SelectOption::new("a", "Alpha"),
            SelectOption::new("b", "Beta"),
            SelectOption::new("c", "Gamma"),
        ];
        field
    }

    #[test]
    fn text_edit_then_successful_commit_moves_baseline() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        assert_eq!(session.kind(), FieldKind::Text);
        assert_eq!(session.state(), SessionState::Clean);

        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        assert!(session.is_dirty());

        let request = session
            .commit()
            .expect("expected commit to validate")
            .expect("expected a save request");
        assert_eq!(request.service, "api");
        assert_eq!(request.field, "workers");
        assert_eq!(request.value, SettingValue::text("8"));
        assert!(session.is_in_flight());

        let status = session.complete_commit(request.ticket, Ok(()));
        assert_eq!(status, CommitStatus::Saved);
        assert_eq!(session.baseline(), Some(&SettingValue::text("8")));
        assert!(!session.is_dirty());
        assert!(!session.is_in_flight());
    }

    #[test]
    fn toggle_edit_then_discard_restores_baseline() {
        let mut session = FormSession::new("api", toggle_field("enabled", true));
        assert_eq!(session.kind(), FieldKind::Toggle);

        session
            .edit(Some(SettingValue::Bool(false)))
            .expect("expected edit to apply");
        assert!(session.is_dirty());

        session.discard();
        assert_eq!(session.working(), Some(&SettingValue::Bool(true)));
        assert!(!session.is_dirty());
    }

    #[test]
    fn editing_back_to_baseline_clears_dirty() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        for value in ["5", "6", "", "7"] {
            session
                .edit(Some(SettingValue::text(value)))
                .expect("expected edit to apply");
            assert!(session.is_dirty(), "{value:?} should be dirty");
        }

        session
            .edit(Some(SettingValue::text("4")))
            .expect("expected edit to apply");
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn multi_select_reordering_is_not_an_edit() {
        let mut session = FormSession::new("api", multi_field("features", &["a", "b"]));
        session
            .edit(Some(SettingValue::selection(["b", "a"])))
            .expect("expected edit to apply");
        assert!(!session.is_dirty());

        session
            .edit(Some(SettingValue::selection(["b"])))
            .expect("expected edit to apply");
        assert!(session.is_dirty());
    }

    #[test]
    fn commit_on_clean_session_issues_nothing() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        assert!(session.commit().expect("expected no error").is_none());
        assert!(!session.is_in_flight());
    }

    #[test]
    fn invalid_text_is_refused_and_stays_dirty() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("   ")))
            .expect("expected edit to apply");

        let err = session.commit().expect_err("expected validation error");
        assert!(
            matches!(&err, DeckError::Validation { field, .. } if field == "workers"),
            "unexpected error: {err}"
        );
        assert!(session.is_dirty());
        assert!(!session.is_in_flight());
        assert_eq!(session.working(), Some(&SettingValue::text("   ")));
        assert!(session.last_error().is_some());
    }

    #[test]
    fn failed_save_keeps_edit_and_allows_retry() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");

        let first = session.commit().expect("commit").expect("request");
        let status = session.complete_commit(first.ticket, Err("daemon unavailable".to_string()));
        assert_eq!(status, CommitStatus::Failed);
        assert!(session.is_dirty());
        assert_eq!(session.working(), Some(&SettingValue::text("8")));
        assert_eq!(session.baseline(), Some(&SettingValue::text("4")));
        assert_eq!(session.last_error(), Some("daemon unavailable"));

        let retry = session.commit().expect("commit").expect("request");
        assert_ne!(retry.ticket, first.ticket);
        assert_eq!(session.complete_commit(retry.ticket, Ok(())), CommitStatus::Saved);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn second_commit_while_in_flight_is_refused() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let _request = session.commit().expect("commit").expect("request");

        assert!(matches!(
            session.commit(),
            Err(DeckError::RequestInFlight(name)) if name == "workers"
        ));
    }

    #[test]
    fn edit_during_save_stays_dirty_against_saved_value() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let request = session.commit().expect("commit").expect("request");

        session
            .edit(Some(SettingValue::text("9")))
            .expect("expected edit to apply");
        session.complete_commit(request.ticket, Ok(()));

        assert_eq!(session.baseline(), Some(&SettingValue::text("8")));
        assert!(session.is_dirty());
    }

    #[test]
    fn discard_during_save_settles_clean_on_saved_value() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let request = session.commit().expect("commit").expect("request");

        session.discard();
        assert_eq!(session.working(), Some(&SettingValue::text("4")));
        assert!(!session.is_dirty());

        assert_eq!(session.complete_commit(request.ticket, Ok(())), CommitStatus::Saved);
        assert_eq!(session.baseline(), Some(&SettingValue::text("8")));
        assert_eq!(session.working(), Some(&SettingValue::text("8")));
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn edit_after_discard_during_save_is_kept() {
        let mut session = FormSession::new("api", text_field("workers", "4"));
        session
            .edit(Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let request = session.commit().expect("commit").expect("request");

        session.discard();
        session
            .edit(Some(SettingValue::text("9")))
            .expect("expected edit to apply");
        session.complete_commit(request.ticket, Ok(()));

        assert_eq!(session.working(), Some(&SettingValue::text("9")));
        assert!(session.is_dirty());
    }

    #[test]
    fn configuration_error_names_field_once() {
        let mut field = SettingField::new("levels", None);
        field.multi = true;
        let session = FormSession::new("api", field);

        let message = session
            .configuration_error()
            .expect("expected a configuration error")
            .to_string();
        assert_eq!(
            message,
            "setting levels is misconfigured: multi-select field declares no options"
        );
    }

    #[test]
    fn misconfigured_field_is_disabled_not_fatal() {
        let mut field = SettingField::new("levels", None);
        field.multi = true;
        let mut session = FormSession::new("api", field);

        assert!(!session.is_enabled());
        assert_eq!(session.kind(), FieldKind::MultiSelect);
        assert!(matches!(
            session.configuration_error(),
            Some(DeckError::Configuration { .. })
        ));
        assert!(matches!(
            session.edit(Some(SettingValue::selection(["x"]))),
            Err(DeckError::Configuration { .. })
        ));
        assert!(!session.is_dirty());
    }

    #[test]
    fn form_sessions_are_independent() {
        let mut form = SettingsForm::new(
            "api",
            vec![text_field("workers", "4"), toggle_field("enabled", true)],
        );

        form.edit("workers", Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        form.edit("enabled", Some(SettingValue::Bool(false)))
            .expect("expected edit to apply");

        let request = form.commit("workers").expect("commit").expect("request");
        assert_eq!(form.complete_commit(&request, Ok(())), CommitStatus::Saved);

        assert!(!form.session("workers").expect("workers").is_dirty());
        assert!(form.session("enabled").expect("enabled").is_dirty());
        assert_eq!(form.dirty_fields().collect::<Vec<_>>(), vec!["enabled"]);
    }

    #[test]
    fn unknown_field_is_reported() {
        let mut form = SettingsForm::new("api", vec![text_field("workers", "4")]);
        assert!(matches!(
            form.discard("missing"),
            Err(DeckError::UnknownField(name)) if name == "missing"
        ));
    }

    #[test]
    fn reload_keeps_dirty_sessions_and_refreshes_clean_ones() {
        let mut form = SettingsForm::new(
            "api",
            vec![text_field("workers", "4"), text_field("port", "8080")],
        );
        form.edit("workers", Some(SettingValue::text("8")))
            .expect("expected edit to apply");

        form.reload(vec![
            text_field("port", "9090"),
            text_field("workers", "6"),
            text_field("host", "0.0.0.0"),
        ]);

        let names = form.sessions().iter().map(|s| s.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["port", "workers", "host"]);
        let workers = form.session("workers").expect("workers");
        assert_eq!(workers.working(), Some(&SettingValue::text("8")));
        assert_eq!(workers.baseline(), Some(&SettingValue::text("4")));
        assert_eq!(
            form.session("port").expect("port").baseline(),
            Some(&SettingValue::text("9090"))
        );
    }

    #[test]
    fn response_for_replaced_session_is_ignored() {
        let mut form = SettingsForm::new("api", vec![text_field("workers", "4")]);
        form.edit("workers", Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let stale = form.commit("workers").expect("commit").expect("request");

        // The view was torn down and rebuilt from fresh data while the save was outstanding.
        let mut rebuilt = SettingsForm::new("api", vec![text_field("workers", "4")]);
        rebuilt
            .edit("workers", Some(SettingValue::text("5")))
            .expect("expected edit to apply");
        let current = rebuilt.commit("workers").expect("commit").expect("request");
        assert_ne!(stale.ticket, current.ticket);

        assert_eq!(rebuilt.complete_commit(&stale, Ok(())), CommitStatus::Stale);
        let workers = rebuilt.session("workers").expect("workers");
        assert!(workers.is_in_flight());
        assert_eq!(workers.baseline(), Some(&SettingValue::text("4")));
    }

    #[test]
    fn response_for_another_service_is_ignored() {
        let mut form = SettingsForm::new("api", vec![text_field("workers", "4")]);
        form.edit("workers", Some(SettingValue::text("8")))
            .expect("expected edit to apply");
        let mut request = form.commit("workers").expect("commit").expect("request");
        request.service = "worker".to_string();

        assert_eq!(form.complete_commit(&request, Ok(())), CommitStatus::Stale);
    }

    #[test]
    fn duplicate_field_names_keep_the_first() {
        let form = SettingsForm::new(
            "api",
            vec![text_field("workers", "4"), text_field("workers", "9")],
        );
        assert_eq!(form.len(), 1);
        assert_eq!(
            form.session("workers").expect("workers").baseline(),
            Some(&SettingValue::text("4"))
        );
    }
}
