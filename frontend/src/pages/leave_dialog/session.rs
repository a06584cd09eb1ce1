use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use super::registry::LeaveVariantRegistry;
use super::repository::LeaveApi;
use super::transition::{FetchOutcome, FetchTicket, TransitionController, TransitionError};

/// Shared handle to the dialog's controller.
///
/// Borrows never span an `.await`; async work reborrows once it resumes.
#[derive(Clone)]
pub struct DialogSession(Rc<RefCell<TransitionController>>);

impl DialogSession {
    pub fn new(registry: Rc<LeaveVariantRegistry>) -> Self {
        Self(Rc::new(RefCell::new(TransitionController::new(registry))))
    }

    pub fn controller(&self) -> Ref<'_, TransitionController> {
        self.0.borrow()
    }

    pub fn controller_mut(&self) -> RefMut<'_, TransitionController> {
        self.0.borrow_mut()
    }

    /// Opens the dialog on a stored record. The leave type comes from the
    /// fetched record once it arrives.
    pub async fn open_for_edit(
        &self,
        api: &dyn LeaveApi,
        record_id: &str,
    ) -> Result<FetchOutcome, TransitionError> {
        let ticket = self.controller_mut().begin_edit(record_id)?;
        Ok(self.fetch_and_apply(api, ticket).await)
    }

    /// Second half of an edit-open started with `begin_edit`.
    pub async fn fetch_and_apply(&self, api: &dyn LeaveApi, ticket: FetchTicket) -> FetchOutcome {
        let result = api.fetch_leave_record(&ticket.record_id).await;
        if let Err(err) = &result {
            log::warn!("fetching leave record {} failed: {}", ticket.record_id, err);
        }
        self.controller_mut().complete_fetch(ticket, result)
    }
}
