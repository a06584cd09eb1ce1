use serde_json::Value;
use uuid::Uuid;

use super::{
    client::ApiClient,
    types::{ApiError, LeaveRecord, SubmittedRecord},
};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

impl ApiClient {
    pub async fn get_leave_record(&self, id: &str) -> Result<LeaveRecord, ApiError> {
        let base_url = self.resolved_base_url().await;
        let response = self
            .send(
                self.http_client()
                    .get(format!("{}/requests/{}", base_url, id)),
            )
            .await?;
        self.map_json_response(response).await
    }

    pub async fn create_leave_request(
        &self,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        let base_url = self.resolved_base_url().await;
        let response = self
            .send(
                self.http_client()
                    .post(format!("{}/requests/leave", base_url))
                    .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
                    .json(payload),
            )
            .await?;
        self.map_json_response(response).await
    }

    pub async fn update_leave_request(
        &self,
        id: &str,
        payload: &Value,
        idempotency_key: Uuid,
    ) -> Result<SubmittedRecord, ApiError> {
        let base_url = self.resolved_base_url().await;
        let response = self
            .send(
                self.http_client()
                    .put(format!("{}/requests/{}", base_url, id))
                    .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
                    .json(payload),
            )
            .await?;
        self.map_json_response(response).await
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod host_tests {
    use super::*;
    use crate::api::test_support::mock::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new_with_base_url(server.url("/api"))
    }

    #[tokio::test]
    async fn get_leave_record_reads_flattened_attributes() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/requests/leave-1");
            then.status(200).json_body(json!({
                "id": "leave-1",
                "leave_type": "maternity",
                "status": "pending",
                "expected_due_date": "2025-06-01",
                "start_date": "2025-04-20",
                "weeks": 16
            }));
        });

        let record = client(&server).get_leave_record("leave-1").await.unwrap();
        assert_eq!(record.leave_type, "maternity");
        assert_eq!(record.attributes.get("weeks"), Some(&json!(16)));
    }

    #[tokio::test]
    async fn get_leave_record_maps_missing_record_to_not_found() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/requests/missing");
            then.status(404)
                .json_body(json!({ "error": "Leave request not found", "code": "NOT_FOUND" }));
        });

        let err = client(&server).get_leave_record("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.error, "Leave request not found");
    }

    #[tokio::test]
    async fn create_and_update_send_idempotency_key() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/requests/leave");
            then.status(200)
                .json_body(json!({ "id": "leave-2", "leave_type": "wfh", "status": "pending" }));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/api/requests/leave-2");
            then.status(200)
                .json_body(json!({ "id": "leave-2", "leave_type": "wfh", "status": "pending" }));
        });

        let api = client(&server);
        let key = Uuid::new_v4();
        let payload = json!({ "leave_type": "wfh", "date": "2025-02-03" });
        let created = api.create_leave_request(&payload, key).await.unwrap();
        assert_eq!(created.id, "leave-2");
        api.update_leave_request("leave-2", &payload, key).await.unwrap();

        let received = server.received();
        assert_eq!(received.len(), 2);
        for request in received {
            assert_eq!(request.idempotency_key, Some(key.to_string()));
            assert_eq!(request.body, Some(payload.clone()));
        }
    }

    #[tokio::test]
    async fn server_side_rejection_surfaces_as_validation_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/requests/leave");
            then.status(400).json_body(json!({
                "error": "Validation failed",
                "code": "VALIDATION_ERROR",
                "details": { "errors": ["end_date"] }
            }));
        });

        let err = client(&server)
            .create_leave_request(&json!({ "leave_type": "holiday" }), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.details.is_some());
    }
}
