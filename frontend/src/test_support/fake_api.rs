use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::api::{ApiError, LeaveRecord, SubmittedRecord};
use crate::pages::leave_dialog::repository::LeaveApi;

type Reply<T> = oneshot::Receiver<Result<T, ApiError>>;

enum Scripted<T> {
    Ready(Result<T, ApiError>),
    Later(Reply<T>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T, ApiError> {
        match self {
            Scripted::Ready(result) => result,
            Scripted::Later(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::request_failed("reply dropped"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitCall {
    pub record_id: Option<String>,
    pub payload: Value,
    pub idempotency_key: Uuid,
}

/// In-memory `LeaveApi`. Fetches and submissions can be scripted to reply
/// immediately or when a test releases them.
#[derive(Default)]
pub struct FakeLeaveApi {
    records: RefCell<HashMap<String, Scripted<LeaveRecord>>>,
    replies: RefCell<VecDeque<Scripted<SubmittedRecord>>>,
    calls: RefCell<Vec<SubmitCall>>,
}

impl FakeLeaveApi {
    pub fn with_record(self, record: LeaveRecord) -> Self {
        self.records
            .borrow_mut()
            .insert(record.id.clone(), Scripted::Ready(Ok(record)));
        self
    }

    pub fn with_pending_fetch(self, id: &str, reply: Reply<LeaveRecord>) -> Self {
        self.records
            .borrow_mut()
            .insert(id.to_string(), Scripted::Later(reply));
        self
    }

    pub fn respond_with(self, result: Result<SubmittedRecord, ApiError>) -> Self {
        self.replies.borrow_mut().push_back(Scripted::Ready(result));
        self
    }

    pub fn respond_later(self, reply: Reply<SubmittedRecord>) -> Self {
        self.replies.borrow_mut().push_back(Scripted::Later(reply));
        self
    }

    pub fn calls(&self) -> Vec<SubmitCall> {
        self.calls.borrow().clone()
    }

    async fn record_submission(
        &self,
        record_id: Option<&str>,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        self.calls.borrow_mut().push(SubmitCall {
            record_id: record_id.map(str::to_string),
            payload: payload.clone(),
            idempotency_key,
        });
        let scripted = self.replies.borrow_mut().pop_front();
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Ok(SubmittedRecord {
                id: record_id.unwrap_or("leave-new").to_string(),
                leave_type: payload["leave_type"].as_str().unwrap_or_default().to_string(),
                status: "pending".into(),
            }),
        }
    }
}

#[async_trait(?Send)]
impl LeaveApi for FakeLeaveApi {
    async fn fetch_leave_record(&self, id: &str) -> Result<LeaveRecord, ApiError> {
        let scripted = self.records.borrow_mut().remove(id);
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Err(ApiError::not_found(format!("leave record {} not found", id))),
        }
    }

    async fn create_leave_request(
        &self,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        self.record_submission(None, payload, idempotency_key).await
    }

    async fn update_leave_request(
        &self,
        id: &str,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        self.record_submission(Some(id), payload, idempotency_key)
            .await
    }
}
