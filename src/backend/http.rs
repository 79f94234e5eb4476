//! REST implementation of the task gateway.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{AuthTokenProvider, CreateTaskArgs, GatewayError, RemoteTask, TaskGateway, TaskPage, UpdateTaskArgs};

#[derive(Serialize)]
struct CreateBody<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(rename = "userId")]
    user_id: u64,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

/// Gateway talking to the `/todos` REST endpoints.
pub struct HttpTaskGateway {
    client: Client,
    base_url: String,
    user_id: u64,
    tokens: Arc<dyn AuthTokenProvider>,
}

impl HttpTaskGateway {
    /// Create a gateway for `base_url`; every request is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        user_id: u64,
        timeout: Duration,
        tokens: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.valid_access_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, GatewayError> {
        let response = self.authorized(request).await.send().await.map_err(map_transport_error)?;
        let status = response.status();
        debug!("{} -> {}", what, status);

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(format!("{what}: {status}")),
            StatusCode::NOT_FOUND => GatewayError::NotFound(what.to_string()),
            _ => GatewayError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidData(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        GatewayError::Network(e.to_string())
    } else if e.is_decode() {
        GatewayError::InvalidData(e.to_string())
    } else {
        GatewayError::Other(e.to_string())
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    fn gateway_type(&self) -> &str {
        "http"
    }

    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<TaskPage, GatewayError> {
        let request = self.client.get(self.url("/todos")).query(&[
            ("_limit", limit),
            ("_offset", offset),
            ("userId", self.user_id),
        ]);
        let response = self.send(request, "GET /todos").await?;
        Self::json(response).await
    }

    async fn fetch_task(&self, remote_id: &str) -> Result<RemoteTask, GatewayError> {
        let request = self.client.get(self.url(&format!("/todos/{remote_id}")));
        let response = self.send(request, &format!("GET /todos/{remote_id}")).await?;
        Self::json(response).await
    }

    async fn create_task(&self, args: CreateTaskArgs) -> Result<RemoteTask, GatewayError> {
        let body = CreateBody {
            title: &args.title,
            body: &args.description,
            user_id: self.user_id,
        };
        let request = self.client.post(self.url("/todos")).json(&body);
        let response = self.send(request, "POST /todos").await?;
        Self::json(response).await
    }

    async fn update_task(&self, remote_id: &str, args: UpdateTaskArgs) -> Result<RemoteTask, GatewayError> {
        let body = UpdateBody {
            title: args.title.as_deref(),
            body: args.description.as_deref(),
            completed: args.completed,
        };
        let request = self.client.put(self.url(&format!("/todos/{remote_id}"))).json(&body);
        let response = self.send(request, &format!("PUT /todos/{remote_id}")).await?;
        Self::json(response).await
    }

    async fn delete_task(&self, remote_id: &str) -> Result<(), GatewayError> {
        let request = self.client.delete(self.url(&format!("/todos/{remote_id}")));
        self.send(request, &format!("DELETE /todos/{remote_id}")).await?;
        Ok(())
    }
}
