use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{ApiError, SubmittedRecord};

use super::repository::LeaveApi;
use super::session::DialogSession;
use super::transition::DialogState;
use super::types::{DialogError, LeaveTypeId, ValidationErrors, WireFormatError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    Create,
    Update(String),
}

/// A validated draft, frozen at the generation it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSubmission {
    pub generation: u64,
    pub leave_type: LeaveTypeId,
    pub target: SubmitTarget,
    pub payload: Value,
    pub idempotency_key: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Submitted(SubmittedRecord),
    /// The response belonged to a draft that is no longer active.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("submission failed: {0}")]
    Failure(ApiError),
    #[error("a submission for this draft is already in flight")]
    AlreadySubmitting,
    #[error(transparent)]
    Draft(#[from] DialogError),
    #[error(transparent)]
    Encoding(#[from] WireFormatError),
}

struct IssuedKey {
    generation: u64,
    payload: Value,
    key: Uuid,
}

pub struct SubmissionPipeline {
    api: Rc<dyn LeaveApi>,
    key: RefCell<Option<IssuedKey>>,
}

impl SubmissionPipeline {
    pub fn new(api: Rc<dyn LeaveApi>) -> Self {
        Self {
            api,
            key: RefCell::new(None),
        }
    }

    pub async fn submit(&self, session: &DialogSession) -> Result<SubmissionOutcome, SubmitError> {
        let prepared = self.prepare(session)?;
        let result = self.send(&prepared).await;
        self.complete(session, &prepared, result)
    }

    pub async fn send(&self, prepared: &PreparedSubmission) -> Result<SubmittedRecord, ApiError> {
        match &prepared.target {
            SubmitTarget::Create => {
                self.api
                    .create_leave_request(&prepared.payload, prepared.idempotency_key)
                    .await
            }
            SubmitTarget::Update(id) => {
                self.api
                    .update_leave_request(id, &prepared.payload, prepared.idempotency_key)
                    .await
            }
        }
    }

    /// Validates the active draft and marks its generation as submitting.
    /// Nothing is sent when validation fails.
    pub fn prepare(&self, session: &DialogSession) -> Result<PreparedSubmission, SubmitError> {
        let mut controller = session.controller_mut();
        let draft = controller
            .store()
            .ok_or(DialogError::NoActiveDraft)?
            .snapshot()?;
        let registry = Rc::clone(controller.registry());
        let descriptor = registry.resolve(draft.leave_type)?;

        let errors = descriptor.validate(&draft);
        if !errors.is_empty() {
            log::debug!("{} draft rejected: {}", draft.leave_type, errors);
            return Err(SubmitError::Validation(errors));
        }
        let payload = descriptor.to_wire_format(&draft)?;

        if !controller.begin_submission() {
            return Err(SubmitError::AlreadySubmitting);
        }
        let target = match &draft.source_record_id {
            Some(id) => SubmitTarget::Update(id.clone()),
            None => SubmitTarget::Create,
        };
        log::info!(
            "submitting {} leave request (generation {})",
            draft.leave_type,
            draft.generation
        );
        let idempotency_key = self.idempotency_key(draft.generation, &payload);
        Ok(PreparedSubmission {
            generation: draft.generation,
            leave_type: draft.leave_type,
            target,
            payload,
            idempotency_key,
        })
    }

    /// Applies a response. It only touches the dialog when the submitted
    /// generation is still the active one.
    pub fn complete(
        &self,
        session: &DialogSession,
        prepared: &PreparedSubmission,
        result: Result<SubmittedRecord, ApiError>,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let mut controller = session.controller_mut();
        controller.finish_submission(prepared.generation);

        let still_active = matches!(controller.state(), DialogState::Active(_))
            && controller.current_generation() == prepared.generation;
        if !still_active {
            log::debug!(
                "discarding submission response for generation {}",
                prepared.generation
            );
            return Ok(SubmissionOutcome::Discarded);
        }

        match result {
            Ok(record) => {
                log::info!("leave request {} saved", record.id);
                *self.key.borrow_mut() = None;
                controller.close();
                Ok(SubmissionOutcome::Submitted(record))
            }
            Err(err) => {
                log::warn!("leave request submission failed: {}", err);
                Err(SubmitError::Failure(err))
            }
        }
    }

    /// A retry of the same payload reuses its key. Any edit or reseed gets a
    /// fresh one.
    fn idempotency_key(&self, generation: u64, payload: &Value) -> Uuid {
        let mut issued = self.key.borrow_mut();
        let reusable = issued
            .as_ref()
            .filter(|prev| prev.generation == generation && prev.payload == *payload)
            .map(|prev| prev.key);
        if let Some(key) = reusable {
            return key;
        }
        let key = Uuid::new_v4();
        *issued = Some(IssuedKey {
            generation,
            payload: payload.clone(),
            key,
        });
        key
    }
}
