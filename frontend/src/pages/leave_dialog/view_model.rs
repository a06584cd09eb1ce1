use leptos::*;
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::{ApiClient, SubmittedRecord};
use crate::config;

use super::draft::DraftEvent;
use super::registry::{shared_registry, LeaveVariantDescriptor, LeaveVariantRegistry};
use super::repository::{LeaveApi, LeaveRepository};
use super::session::DialogSession;
use super::submission::{SubmissionOutcome, SubmissionPipeline, SubmitError};
use super::transition::DialogState;
use super::types::{DialogError, FieldError, LeaveDraft, LeaveTypeId, ValidationErrors};

#[cfg(target_arch = "wasm32")]
const INPUT_DEBOUNCE_MS: u32 = 250;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageState {
    pub success: Option<String>,
    pub error: Option<String>,
}

impl MessageState {
    pub fn set_success(&mut self, msg: impl Into<String>) {
        self.success = Some(msg.into());
        self.error = None;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
        self.success = None;
    }

    pub fn clear(&mut self) {
        self.success = None;
        self.error = None;
    }
}

/// A debounced text edit that has not been applied yet.
struct PendingEdit {
    ticket: u64,
    generation: u64,
    raw: String,
}

/// Latest not-yet-applied text edit per field.
#[derive(Default)]
struct PendingEdits {
    next_ticket: u64,
    by_field: HashMap<String, PendingEdit>,
}

impl PendingEdits {
    fn queue(&mut self, field: &str, generation: u64, raw: String) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.by_field.insert(
            field.to_string(),
            PendingEdit {
                ticket,
                generation,
                raw,
            },
        );
        ticket
    }

    /// Hands the edit out only if `ticket` is still the newest one for `field`.
    fn take(&mut self, field: &str, ticket: u64) -> Option<PendingEdit> {
        match self.by_field.get(field) {
            Some(edit) if edit.ticket == ticket => self.by_field.remove(field),
            _ => None,
        }
    }

    fn drain(&mut self) -> Vec<(String, PendingEdit)> {
        self.by_field.drain().collect()
    }
}

#[derive(Clone, Copy)]
pub struct LeaveDialogViewModel {
    pub state: RwSignal<DialogState>,
    pub draft: RwSignal<Option<LeaveDraft>>,
    pub field_errors: RwSignal<ValidationErrors>,
    pub message: RwSignal<MessageState>,
    pub submitting: RwSignal<bool>,
    pub last_submitted: RwSignal<Option<SubmittedRecord>>,
    registry: StoredValue<Rc<LeaveVariantRegistry>>,
    session: StoredValue<DialogSession>,
    api: StoredValue<Rc<dyn LeaveApi>>,
    pipeline: StoredValue<Rc<SubmissionPipeline>>,
    pending_edits: StoredValue<PendingEdits>,
}

impl LeaveDialogViewModel {
    pub fn new() -> Self {
        let client = use_context::<ApiClient>().unwrap_or_else(ApiClient::new);
        Self::with_api(Rc::new(LeaveRepository::new(client)), shared_registry())
    }

    pub fn with_api(api: Rc<dyn LeaveApi>, registry: Rc<LeaveVariantRegistry>) -> Self {
        let state = create_rw_signal(DialogState::Closed);
        let draft = create_rw_signal(None::<LeaveDraft>);
        let field_errors = create_rw_signal(ValidationErrors::default());
        let session = DialogSession::new(Rc::clone(&registry));

        // Renderers only write signals; they run while the controller is
        // mutably borrowed. A seed publishes the active type and its draft in
        // one batch so no effect sees one without the other.
        session
            .controller_mut()
            .attach_renderer(Rc::new(move |event: DraftEvent<'_>| match event {
                DraftEvent::Updated { draft: current, field } => {
                    draft.set(Some(current.clone()));
                    field_errors.update(|errors| {
                        errors.clear_field(field);
                    });
                }
                DraftEvent::Seeded(current) => batch(|| {
                    state.set(DialogState::Active(current.leave_type));
                    draft.set(Some(current.clone()));
                    field_errors.set(ValidationErrors::default());
                }),
                DraftEvent::Cleared { .. } => batch(|| {
                    draft.set(None);
                    field_errors.set(ValidationErrors::default());
                }),
            }));

        let pipeline = Rc::new(SubmissionPipeline::new(Rc::clone(&api)));
        Self {
            state,
            draft,
            field_errors,
            message: create_rw_signal(MessageState::default()),
            submitting: create_rw_signal(false),
            last_submitted: create_rw_signal(None),
            registry: store_value(registry),
            session: store_value(session),
            api: store_value(api),
            pipeline: store_value(pipeline),
            pending_edits: store_value(PendingEdits::default()),
        }
    }

    pub fn leave_types(&self) -> Vec<(LeaveTypeId, &'static str)> {
        self.registry.with_value(|registry| {
            registry
                .types()
                .into_iter()
                .filter_map(|id| {
                    registry
                        .resolve(id)
                        .ok()
                        .map(|descriptor| (id, descriptor.display.label))
                })
                .collect()
        })
    }

    pub fn descriptor(&self, type_id: LeaveTypeId) -> Option<LeaveVariantDescriptor> {
        self.registry
            .with_value(|registry| registry.resolve(type_id).ok().cloned())
    }

    pub fn open_new(&self, type_id: LeaveTypeId) {
        self.message.update(|msg| msg.clear());
        let result = self
            .session
            .with_value(|session| session.controller_mut().open_new(type_id));
        if let Err(err) = result {
            log::warn!("opening a {} request rejected: {}", type_id, err);
            self.message.update(|msg| msg.set_error(err.to_string()));
        }
        self.sync();
    }

    pub fn open_default(&self) {
        self.open_new(config::default_leave_type());
    }

    /// Shows the loading state right away; the type is chosen by the record
    /// when the fetch lands.
    pub fn open_edit(&self, record_id: String) {
        self.message.update(|msg| msg.clear());
        let (session, api) = (self.session.get_value(), self.api.get_value());
        let ticket = session.controller_mut().begin_edit(&record_id);
        self.sync();
        let ticket = match ticket {
            Ok(ticket) => ticket,
            Err(err) => {
                self.message.update(|msg| msg.set_error(err.to_string()));
                return;
            }
        };
        let vm = *self;
        spawn_local(async move {
            let outcome = session.fetch_and_apply(api.as_ref(), ticket).await;
            log::debug!("edit-open of {} finished: {:?}", record_id, outcome);
            vm.sync();
        });
    }

    pub fn select_type(&self, type_id: LeaveTypeId) {
        let result = self
            .session
            .with_value(|session| session.controller_mut().select_type(type_id));
        if let Err(err) = result {
            log::warn!("leave type change to {} rejected: {}", type_id, err);
        }
        self.sync();
    }

    pub fn update_field(&self, name: &str, raw: &str) {
        self.apply_input(None, name, raw);
    }

    /// Text edits are applied once typing pauses. Only the newest value of a
    /// field is applied, and only if the draft it was typed into is still the
    /// active one.
    pub fn update_field_debounced(&self, name: String, raw: String) {
        let generation = self
            .session
            .with_value(|session| session.controller().current_generation());
        let mut ticket = 0;
        self.pending_edits
            .update_value(|pending| ticket = pending.queue(&name, generation, raw));
        let vm = *self;
        spawn_local(async move {
            debounce_delay().await;
            let edit = vm
                .pending_edits
                .try_update_value(|pending| pending.take(&name, ticket))
                .flatten();
            if let Some(edit) = edit {
                vm.apply_input(Some(edit.generation), &name, &edit.raw);
            }
        });
    }

    /// Applies every pending text edit right away.
    fn flush_pending_edits(&self) {
        let edits = self
            .pending_edits
            .try_update_value(PendingEdits::drain)
            .unwrap_or_default();
        for (name, edit) in edits {
            self.apply_input(Some(edit.generation), &name, &edit.raw);
        }
    }

    pub fn submit(&self) {
        let (session, pipeline) = (self.session.get_value(), self.pipeline.get_value());
        self.message.update(|msg| msg.clear());
        self.flush_pending_edits();
        let prepared = match pipeline.prepare(&session) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.apply_submission(Err(err));
                return;
            }
        };
        self.sync();
        let vm = *self;
        spawn_local(async move {
            let result = pipeline.send(&prepared).await;
            vm.apply_submission(pipeline.complete(&session, &prepared, result));
        });
    }

    pub fn close(&self) {
        self.session
            .with_value(|session| session.controller_mut().close());
        self.sync();
    }

    fn apply_input(&self, generation: Option<u64>, name: &str, raw: &str) {
        let registry = self.registry.get_value();
        let result = self.session.with_value(|session| -> Result<bool, DialogError> {
            let mut controller = session.controller_mut();
            let leave_type = controller
                .active_draft()
                .map(|draft| draft.leave_type)
                .ok_or(DialogError::NoActiveDraft)?;
            let value = registry
                .resolve(leave_type)?
                .field(name)
                .ok_or_else(|| DialogError::UnknownField {
                    leave_type,
                    field: name.to_string(),
                })?
                .parse_input(raw)?;
            match generation {
                Some(generation) => controller.update_field_at(generation, name, value),
                None => controller.update_field(name, value).map(|_| true),
            }
        });
        match result {
            Ok(_) => {}
            Err(DialogError::InvalidInput { field, message }) => {
                self.field_errors.update(|errors| {
                    errors.clear_field(&field);
                    errors.push(FieldError::new(field.clone(), "invalid_input", message));
                });
            }
            Err(err) => log::warn!("input for `{}` dropped: {}", name, err),
        }
    }

    fn apply_submission(&self, result: Result<SubmissionOutcome, SubmitError>) {
        match result {
            Ok(SubmissionOutcome::Submitted(record)) => {
                let text = if record.id.is_empty() {
                    "休暇申請を送信しました。".to_string()
                } else {
                    format!("休暇申請を送信しました。（{}）", record.id)
                };
                self.message.update(|msg| msg.set_success(text));
                self.last_submitted.set(Some(record));
            }
            Ok(SubmissionOutcome::Discarded) => {}
            Err(SubmitError::Validation(errors)) => {
                self.field_errors.set(errors);
                self.message
                    .update(|msg| msg.set_error("入力内容を確認してください。"));
            }
            Err(SubmitError::AlreadySubmitting) => {}
            Err(SubmitError::Failure(err)) => {
                self.message.update(|msg| msg.set_error(err.error.clone()));
            }
            Err(err) => {
                log::error!("leave request could not be submitted: {}", err);
                self.message.update(|msg| msg.set_error(err.to_string()));
            }
        }
        self.sync();
    }

    fn sync(&self) {
        let snapshot = self.session.try_with_value(|session| {
            let controller = session.controller();
            (controller.state().clone(), controller.is_submitting())
        });
        if let Some((state, submitting)) = snapshot {
            if self.state.with_untracked(|current| *current != state) {
                self.state.set(state);
            }
            if self.submitting.get_untracked() != submitting {
                self.submitting.set(submitting);
            }
        }
    }
}

#[cfg(test)]
impl LeaveDialogViewModel {
    pub(crate) fn session_for_test(&self) -> DialogSession {
        self.session.get_value()
    }

    pub(crate) fn refresh_for_test(&self) {
        self.sync();
    }
}

#[cfg(target_arch = "wasm32")]
async fn debounce_delay() {
    gloo_timers::future::TimeoutFuture::new(INPUT_DEBOUNCE_MS).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn debounce_delay() {}

pub fn use_leave_dialog_view_model() -> LeaveDialogViewModel {
    match use_context::<LeaveDialogViewModel>() {
        Some(vm) => vm,
        None => {
            let vm = LeaveDialogViewModel::new();
            provide_context(vm);
            vm
        }
    }
}
