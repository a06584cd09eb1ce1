use async_trait::async_trait;
use serde_json::Value;
use std::rc::Rc;
use uuid::Uuid;

use crate::api::{ApiClient, ApiError, LeaveRecord, SubmittedRecord};

/// Backend operations the leave dialog depends on.
#[async_trait(?Send)]
pub trait LeaveApi {
    async fn fetch_leave_record(&self, id: &str) -> Result<LeaveRecord, ApiError>;

    async fn create_leave_request(
        &self,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError>;

    async fn update_leave_request(
        &self,
        id: &str,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError>;
}

#[derive(Clone)]
pub struct LeaveRepository {
    client: Rc<ApiClient>,
}

impl LeaveRepository {
    pub fn new(api: ApiClient) -> Self {
        Self {
            client: Rc::new(api),
        }
    }
}

#[async_trait(?Send)]
impl LeaveApi for LeaveRepository {
    async fn fetch_leave_record(&self, id: &str) -> Result<LeaveRecord, ApiError> {
        self.client.get_leave_record(id).await
    }

    async fn create_leave_request(
        &self,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        self.client
            .create_leave_request(payload, idempotency_key)
            .await
    }

    async fn update_leave_request(
        &self,
        id: &str,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        self.client
            .update_leave_request(id, payload, idempotency_key)
            .await
    }
}
