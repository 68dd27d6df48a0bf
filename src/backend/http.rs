//! reqwest-backed [`ChatBackend`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;
use url::Url;

use super::{ChatBackend, EMPTY_ERROR_DETAIL, PromptRequest};
use crate::config::EndpointConfig;
use crate::error::{Error, Result};

/// Backend reached over HTTP at one fixed URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given endpoint.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a backend with a custom reqwest client.
    pub fn with_client(endpoint: &EndpointConfig, http: reqwest::Client) -> Result<Self> {
        let url = Url::parse(&endpoint.url())?;
        Ok(Self { url, http })
    }

    /// Get the request target.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn multipart_form(request: PromptRequest) -> Result<Form> {
        let mut form = Form::new().text("prompt", request.prompt);
        for file in request.attachments {
            let part = Part::bytes(file.content().to_vec())
                .file_name(file.name().to_string())
                .mime_str(file.content_type())?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, request: PromptRequest) -> Result<serde_json::Value> {
        let multipart = request.is_multipart();
        let attachments = request.attachments.len();

        // Multipart bodies get their content type (with boundary) from reqwest.
        let builder = if multipart {
            self.http
                .post(self.url.clone())
                .multipart(Self::multipart_form(request)?)
        } else {
            self.http.post(self.url.clone()).json(&request.json_body())
        };

        debug!(
            name: "backend.request.sent",
            url = %self.url,
            multipart,
            attachments,
            "Prompt sent"
        );

        let response = builder.send().await?;
        let status = response.status();

        debug!(
            name: "backend.response.received",
            status = status.as_u16(),
            "Backend responded"
        );

        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let detail = response.text().await.unwrap_or_default();
            let detail = if detail.is_empty() {
                EMPTY_ERROR_DETAIL.to_string()
            } else {
                detail
            };
            Err(Error::Backend {
                status: status.as_u16(),
                detail,
            })
        }
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}
