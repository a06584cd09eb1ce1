use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{api::types::ApiError, config};

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<String>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
        }
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: Some(base_url.into()),
        }
    }

    pub(crate) async fn resolved_base_url(&self) -> String {
        if let Some(base) = &self.base_url {
            base.clone()
        } else {
            config::await_api_base_url().await
        }
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = request
            .build()
            .map_err(|e| ApiError::request_failed(format!("Failed to build request: {}", e)))?;

        #[cfg(all(test, not(target_arch = "wasm32")))]
        if let Some(responder) = mock_hook::find_mock(request.url().as_str()) {
            return responder.respond(&request)?.into_response();
        }

        self.client
            .execute(request)
            .await
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))
    }

    pub(crate) async fn map_json_response<R>(&self, response: Response) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::map_error_body(status.as_u16(), &body))
        }
    }

    pub(crate) fn map_error_body(status: u16, body: &str) -> ApiError {
        match serde_json::from_str::<ApiError>(body) {
            Ok(error) => error,
            Err(err) => {
                log::debug!("error payload for HTTP {} was not readable: {}", status, err);
                ApiError::from_status(status)
            }
        }
    }
}


#[cfg(all(test, not(target_arch = "wasm32")))]
pub use mock_hook::{register_mock, MockResponse, TestResponder};
