use async_trait::async_trait;
use ocr_types::{ErrorDetail, ServerTaskId, SubmitBatchResponse, TaskStatusResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

use crate::auth::AuthConfig;
use crate::error::{OcrClientError, Result};
use crate::http_client::build_auth_http_client;
use crate::interface::{ExtractionClient, UploadPayload};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Fallback message when a rejection carries no usable error body.
const GENERIC_REJECTION_DETAIL: &str = "Upload failed.";

#[derive(Debug)]
pub struct RemoteExtractionClient {
    client: ClientWithMiddleware,
    endpoint: String,
}

impl RemoteExtractionClient {
    pub fn new(endpoint: &str, auth_config: &Option<AuthConfig>, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: build_auth_http_client(auth_config, user_agent)?,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl ExtractionClient for RemoteExtractionClient {
    async fn submit_batch(
        &self,
        files: Vec<UploadPayload>,
        destination: Option<String>,
    ) -> Result<SubmitBatchResponse> {
        let url = Url::parse(&format!("{}/passports/upload-and-extract/", self.endpoint))?;
        let n_files = files.len();

        let mut form = Form::new();
        for payload in files {
            form = form.part("files", Part::stream(payload.contents).file_name(payload.file_name));
        }
        if let Some(destination) = destination {
            form = form.text("destination", destination);
        }

        debug!("Submit: POST {n_files} files to {url}");
        let response = self.client.post(url).multipart(form).send().await?;

        // The service answers an accepted batch with 202 and the task list;
        // anything else, success codes included, is a rejection.
        match response.status() {
            StatusCode::ACCEPTED => Ok(response.json().await?),
            status => Err(OcrClientError::SubmissionRejected {
                status,
                detail: rejection_detail(response).await,
            }),
        }
    }

    async fn task_status(&self, task_id: &ServerTaskId) -> Result<TaskStatusResponse> {
        let url = Url::parse(&format!("{}/tasks/{task_id}/status", self.endpoint))?;

        let response = self.client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            status => Err(OcrClientError::UnexpectedHttpStatus { api: "task-status", status }),
        }
    }

    async fn cancel_task(&self, task_id: &ServerTaskId) -> Result<()> {
        let url = Url::parse(&format!("{}/tasks/{task_id}/cancel", self.endpoint))?;

        debug!("Cancel: POST to {url}");
        let response = self.client.post(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(OcrClientError::UnexpectedHttpStatus { api: "task-cancel", status }),
        }
    }

    async fn list_destinations(&self) -> Result<Vec<String>> {
        let url = Url::parse(&format!("{}/destinations/", self.endpoint))?;

        let response = self.client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            status => Err(OcrClientError::UnexpectedHttpStatus { api: "destinations", status }),
        }
    }
}

/// Pulls the service's error detail out of a rejection body, falling back to a
/// generic message when the body does not have the expected shape.
async fn rejection_detail(response: Response) -> String {
    match response.json::<ErrorDetail>().await {
        Ok(body) if !body.detail.is_empty() => body.detail,
        _ => GENERIC_REJECTION_DETAIL.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use ocr_types::TaskState;
    use serde_json::json;

    use super::*;

    fn test_client(server: &MockServer) -> RemoteExtractionClient {
        let auth = Some(AuthConfig {
            token: Some("test-token".to_owned()),
            ..Default::default()
        });
        RemoteExtractionClient::new(&server.base_url(), &auth, "ocr-client-tests").unwrap()
    }

    #[tokio::test]
    async fn test_submit_batch_accepted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/passports/upload-and-extract/")
                    .header("authorization", "Bearer test-token")
                    .body_contains("filename=\"passport_a.jpg\"")
                    .body_contains("name=\"destination\"")
                    .body_contains("Lisbon");
                then.status(202).json_body(json!({
                    "tasks": [
                        { "task_id": "11f1e8a0", "filename": "passport_a.jpg" },
                        { "task_id": "58c2b917", "filename": "passport_b.jpg" },
                    ]
                }));
            })
            .await;

        let client = test_client(&server);
        let files = vec![
            UploadPayload::from_bytes("passport_a.jpg", &b"scan a"[..]),
            UploadPayload::from_bytes("passport_b.jpg", &b"scan b"[..]),
        ];

        let ack = client.submit_batch(files, Some("Lisbon".to_owned())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(ack.tasks.len(), 2);
        assert_eq!(ack.tasks[0].task_id, ServerTaskId::from("11f1e8a0"));
        assert_eq!(ack.tasks[1].filename, "passport_b.jpg");
    }

    #[tokio::test]
    async fn test_submit_batch_rejection_surfaces_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/passports/upload-and-extract/");
                then.status(400).json_body(json!({ "detail": "quota exceeded" }));
            })
            .await;

        let client = test_client(&server);
        let err = client
            .submit_batch(vec![UploadPayload::from_bytes("a.jpg", &b"x"[..])], None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            OcrClientError::SubmissionRejected {
                status: StatusCode::BAD_REQUEST,
                detail: "quota exceeded".to_owned(),
            }
        );
    }

    /// A plain 200 is not an acknowledgment; the service promises 202 for an
    /// accepted batch.
    #[tokio::test]
    async fn test_submit_batch_rejects_non_accepted_success_codes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/passports/upload-and-extract/");
                then.status(200).json_body(json!({ "tasks": [] }));
            })
            .await;

        let client = test_client(&server);
        let err = client
            .submit_batch(vec![UploadPayload::from_bytes("a.jpg", &b"x"[..])], None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            OcrClientError::SubmissionRejected {
                status: StatusCode::OK,
                detail: GENERIC_REJECTION_DETAIL.to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_task_status_round_trip() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/tasks/11f1e8a0/status")
                    .header("authorization", "Bearer test-token");
                then.status(200).json_body(json!({
                    "status": "PROGRESS",
                    "progress": { "status": "Uploading to cloud..." }
                }));
            })
            .await;

        let client = test_client(&server);
        let status = client.task_status(&ServerTaskId::from("11f1e8a0")).await.unwrap();

        assert_eq!(status.status, TaskState::Progress);
        assert_eq!(status.progress.unwrap().status, "Uploading to cloud...");
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_task_status_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tasks/gone/status");
                then.status(404);
            })
            .await;

        let client = test_client(&server);
        let err = client.task_status(&ServerTaskId::from("gone")).await.unwrap_err();

        assert!(matches!(
            err,
            OcrClientError::UnexpectedHttpStatus {
                api: "task-status",
                status: StatusCode::NOT_FOUND
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_task_ignores_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/tasks/11f1e8a0/cancel");
                then.status(200).json_body(json!({ "message": "revocation requested" }));
            })
            .await;

        let client = test_client(&server);
        client.cancel_task(&ServerTaskId::from("11f1e8a0")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_destinations() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/destinations/");
                then.status(200).json_body(json!(["Lisbon", "Casablanca", "Tunis"]));
            })
            .await;

        let client = test_client(&server);
        let destinations = client.list_destinations().await.unwrap();

        assert_eq!(destinations, vec!["Lisbon", "Casablanca", "Tunis"]);
    }
}
