use std::rc::Rc;
use thiserror::Error;

use crate::api::{ApiError, LeaveRecord};

use super::draft::{DraftStore, DraftSubscriber};
use super::registry::LeaveVariantRegistry;
use super::types::{DialogError, FieldMap, FieldValue, LeaveDraft, LeaveTypeId, WireFormatError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("unknown leave type: {0}")]
    UnknownLeaveType(String),
    #[error("failed to load leave record: {0}")]
    FetchFailed(ApiError),
    #[error("leave record {record_id} is malformed: {source}")]
    MalformedRecord {
        record_id: String,
        source: WireFormatError,
    },
    #[error("cannot {action} while the dialog is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error(transparent)]
    Draft(DialogError),
}

impl From<DialogError> for TransitionError {
    fn from(error: DialogError) -> Self {
        match error {
            DialogError::UnknownLeaveType(raw) => TransitionError::UnknownLeaveType(raw),
            other => TransitionError::Draft(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    Closed,
    Loading { record_id: String },
    Active(LeaveTypeId),
    Error(TransitionError),
}

impl DialogState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogState::Closed => "closed",
            DialogState::Loading { .. } => "loading",
            DialogState::Active(_) => "active",
            DialogState::Error(_) => "error",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Closed)
    }
}

/// A request to show a particular leave type.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionRequest {
    Blank { target_type: LeaveTypeId },
    /// The target type is always the one stored on the record.
    EditRecord { record: LeaveRecord },
}

/// Issued when a record fetch starts; the completion must hand it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub transition_id: u64,
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied {
        leave_type: LeaveTypeId,
        generation: u64,
    },
    Failed(TransitionError),
    /// The user moved on before the fetch finished.
    Discarded,
}

/// Moves the dialog between leave types and owns the Draft Store of the
/// open session.
pub struct TransitionController {
    registry: Rc<LeaveVariantRegistry>,
    store: Option<DraftStore>,
    state: DialogState,
    pending_transition_id: u64,
    retired_generation: u64,
    renderers: Vec<DraftSubscriber>,
    submitting_generation: Option<u64>,
}

impl TransitionController {
    pub fn new(registry: Rc<LeaveVariantRegistry>) -> Self {
        Self {
            registry,
            store: None,
            state: DialogState::Closed,
            pending_transition_id: 0,
            retired_generation: 0,
            renderers: Vec::new(),
            submitting_generation: None,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn registry(&self) -> &Rc<LeaveVariantRegistry> {
        &self.registry
    }

    pub fn store(&self) -> Option<&DraftStore> {
        self.store.as_ref()
    }

    pub fn active_draft(&self) -> Option<&LeaveDraft> {
        self.store.as_ref().and_then(DraftStore::active)
    }

    pub fn pending_transition_id(&self) -> u64 {
        self.pending_transition_id
    }

    pub fn current_generation(&self) -> u64 {
        self.store
            .as_ref()
            .map(DraftStore::current_generation)
            .unwrap_or(self.retired_generation)
    }

    /// Renderers are subscribed to every Draft Store this controller opens.
    pub fn attach_renderer(&mut self, renderer: DraftSubscriber) {
        if let Some(store) = self.store.as_mut() {
            store.subscribe(Rc::clone(&renderer));
        }
        self.renderers.push(renderer);
    }

    pub fn open_new(&mut self, target_type: LeaveTypeId) -> Result<u64, TransitionError> {
        self.apply(TransitionRequest::Blank { target_type })
    }

    pub fn open_with_record(&mut self, record: LeaveRecord) -> Result<u64, TransitionError> {
        self.apply(TransitionRequest::EditRecord { record })
    }

    /// Seeds the dialog for a request. A registry or record mismatch moves the
    /// dialog to `Error` and is also returned.
    pub fn apply(&mut self, request: TransitionRequest) -> Result<u64, TransitionError> {
        self.ensure_not_failed("open the dialog")?;
        self.pending_transition_id += 1;
        let seeded = match request {
            TransitionRequest::Blank { target_type } => self
                .ensure_store()
                .seed(target_type, FieldMap::new(), None)
                .map(|generation| (target_type, generation))
                .map_err(TransitionError::from),
            TransitionRequest::EditRecord { record } => self.seed_from_record(&record),
        };
        self.settle(seeded)
    }

    /// Starts an edit-open for a record that still has to be fetched.
    pub fn begin_edit(&mut self, record_id: &str) -> Result<FetchTicket, TransitionError> {
        self.ensure_not_failed("open the dialog")?;
        self.pending_transition_id += 1;
        // Nothing of a previously shown type may stay visible while loading.
        self.ensure_store().clear();
        self.state = DialogState::Loading {
            record_id: record_id.to_string(),
        };
        log::info!("loading leave record {}", record_id);
        Ok(FetchTicket {
            transition_id: self.pending_transition_id,
            record_id: record_id.to_string(),
        })
    }

    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<LeaveRecord, ApiError>,
    ) -> FetchOutcome {
        let still_loading = matches!(
            &self.state,
            DialogState::Loading { record_id } if *record_id == ticket.record_id
        );
        if ticket.transition_id != self.pending_transition_id || !still_loading {
            log::debug!(
                "dropping fetch of {} for transition {} (latest is {})",
                ticket.record_id,
                ticket.transition_id,
                self.pending_transition_id
            );
            return FetchOutcome::Discarded;
        }

        let seeded = match result {
            // A later update would target whatever id the record carries.
            Ok(record) if record.id != ticket.record_id => Err(TransitionError::MalformedRecord {
                record_id: ticket.record_id.clone(),
                source: WireFormatError::InvalidValue {
                    field: "id".to_string(),
                    expected: "requested record id",
                    found: record.id,
                },
            }),
            Ok(record) => self.seed_from_record(&record),
            Err(err) => Err(TransitionError::FetchFailed(err)),
        };
        match self.settle(seeded) {
            Ok(generation) => match self.state {
                DialogState::Active(leave_type) => FetchOutcome::Applied {
                    leave_type,
                    generation,
                },
                _ => FetchOutcome::Discarded,
            },
            Err(err) => FetchOutcome::Failed(err),
        }
    }

    /// User re-selected the leave type. Fields reset to the new type's
    /// defaults; the edited record id is kept.
    pub fn select_type(&mut self, target_type: LeaveTypeId) -> Result<u64, TransitionError> {
        let source_record_id = match &self.state {
            DialogState::Active(current) if *current == target_type => {
                log::debug!("{} is already active", target_type);
                return Ok(self.current_generation());
            }
            DialogState::Active(_) => self
                .active_draft()
                .and_then(|draft| draft.source_record_id.clone()),
            DialogState::Loading { record_id } => Some(record_id.clone()),
            state => {
                return Err(TransitionError::InvalidTransition {
                    state: state.name(),
                    action: "change the leave type",
                })
            }
        };
        self.pending_transition_id += 1;
        let seeded = self
            .ensure_store()
            .seed(target_type, FieldMap::new(), source_record_id)
            .map(|generation| (target_type, generation))
            .map_err(TransitionError::from);
        self.settle(seeded)
    }

    pub fn update_field(&mut self, name: &str, value: FieldValue) -> Result<(), DialogError> {
        self.store
            .as_mut()
            .ok_or(DialogError::NoActiveDraft)?
            .update(name, value)
    }

    /// Applies a deferred edit captured at `generation`. Returns `false` when
    /// the draft has been reseeded since.
    pub fn update_field_at(
        &mut self,
        generation: u64,
        name: &str,
        value: FieldValue,
    ) -> Result<bool, DialogError> {
        if generation != self.current_generation() {
            log::debug!("dropping stale edit of `{}` from generation {}", name, generation);
            return Ok(false);
        }
        self.update_field(name, value).map(|_| true)
    }

    /// Routes an unexpected failure to the `Error` state.
    pub fn fail(&mut self, error: TransitionError) {
        log::error!("leave dialog failed: {}", error);
        self.pending_transition_id += 1;
        self.retire_store();
        self.state = DialogState::Error(error);
    }

    pub fn close(&mut self) {
        self.pending_transition_id += 1;
        self.retire_store();
        if self.state.is_open() {
            log::info!("leave dialog closed");
        }
        self.state = DialogState::Closed;
    }

    pub(crate) fn begin_submission(&mut self) -> bool {
        let generation = self.current_generation();
        if self.submitting_generation == Some(generation) {
            return false;
        }
        self.submitting_generation = Some(generation);
        true
    }

    pub(crate) fn finish_submission(&mut self, generation: u64) {
        if self.submitting_generation == Some(generation) {
            self.submitting_generation = None;
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting_generation == Some(self.current_generation())
    }

    fn seed_from_record(
        &mut self,
        record: &LeaveRecord,
    ) -> Result<(LeaveTypeId, u64), TransitionError> {
        let (leave_type, descriptor) = self.registry.resolve_raw(&record.leave_type)?;
        let fields = descriptor
            .from_wire_format(&record.to_payload())
            .map_err(|source| TransitionError::MalformedRecord {
                record_id: record.id.clone(),
                source,
            })?;
        let generation = self
            .ensure_store()
            .seed(leave_type, fields, Some(record.id.clone()))?;
        Ok((leave_type, generation))
    }

    fn settle(
        &mut self,
        seeded: Result<(LeaveTypeId, u64), TransitionError>,
    ) -> Result<u64, TransitionError> {
        match seeded {
            Ok((leave_type, generation)) => {
                log::info!("leave dialog active as {} (generation {})", leave_type, generation);
                self.state = DialogState::Active(leave_type);
                Ok(generation)
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn ensure_not_failed(&self, action: &'static str) -> Result<(), TransitionError> {
        match self.state {
            DialogState::Error(_) => Err(TransitionError::InvalidTransition {
                state: self.state.name(),
                action,
            }),
            _ => Ok(()),
        }
    }

    fn ensure_store(&mut self) -> &mut DraftStore {
        let registry = &self.registry;
        let renderers = &self.renderers;
        let retired_generation = self.retired_generation;
        self.store.get_or_insert_with(|| {
            let mut store = DraftStore::starting_after(Rc::clone(registry), retired_generation);
            for renderer in renderers {
                store.subscribe(Rc::clone(renderer));
            }
            store
        })
    }

    fn retire_store(&mut self) {
        if let Some(store) = self.store.take() {
            self.retired_generation = store.teardown();
        }
        self.submitting_generation = None;
    }
}
