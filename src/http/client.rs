//! HTTP client for the campaign service.
//!
//! This is the boundary where transport-specific failures become
//! [`RawCallFailure`] values: timeouts map to `Timeout`, connection problems
//! to `Transport`, and non-success responses to `Status` with the parsed
//! body and any `retry-after` hint attached. Nothing downstream ever touches
//! a reqwest error.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{
    Campaign, CampaignDraft, CampaignUpdate, DocumentDraft, DocumentReceipt, MediaDraft,
    MediaReceipt, NoteDraft, NoteReceipt,
};
use crate::traits::{CallResult, CampaignService};
use crate::types::RawCallFailure;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// HTTP implementation of [`CampaignService`]
#[derive(Clone)]
pub struct HttpCampaignService {
    client: Client,
    base_url: Url,
}

impl HttpCampaignService {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        // A trailing slash makes Url::join treat the base as a directory
        let normalized = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base_url = Url::parse(&normalized)?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> CallResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RawCallFailure::transport(format!("Invalid request URL '{}': {}", path, e)))
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> CallResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.dispatch(method, path, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::convert_error_response(response).await);
        }
        response.json::<T>().await.map_err(|e| {
            RawCallFailure::transport(format!("Malformed response body: {}", e))
        })
    }

    /// Variant for endpoints whose response body is irrelevant
    async fn send_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> CallResult<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.dispatch(method, path, body).await?;
        if !response.status().is_success() {
            return Err(Self::convert_error_response(response).await);
        }
        Ok(())
    }

    async fn dispatch<B>(&self, method: Method, path: &str, body: Option<&B>) -> CallResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut request = self
            .client
            .request(method, url)
            .header("X-Request-ID", format!("req_{}", Uuid::new_v4().simple()));
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(Self::convert_transport_error)
    }

    fn convert_transport_error(error: reqwest::Error) -> RawCallFailure {
        if error.is_timeout() {
            RawCallFailure::timeout(format!("timeout: {}", error))
        } else {
            RawCallFailure::transport(error.to_string())
        }
    }

    async fn convert_error_response(response: Response) -> RawCallFailure {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = match response.text().await {
            Ok(text) => serde_json::from_str(&text).ok(),
            Err(_) => None,
        };
        RawCallFailure::Status {
            status,
            message: format!("Request failed with status code {}", status),
            body,
            retry_after,
        }
    }
}

impl CampaignService for HttpCampaignService {
    async fn fetch_campaigns(&self) -> CallResult<Vec<Campaign>> {
        self.send(Method::GET, "campaigns", None::<&()>).await
    }

    async fn create_campaign(&self, draft: &CampaignDraft) -> CallResult<Campaign> {
        self.send(Method::POST, "campaigns", Some(draft)).await
    }

    async fn update_campaign(&self, id: &str, update: &CampaignUpdate) -> CallResult<Campaign> {
        self.send(Method::PUT, &format!("campaigns/{}", id), Some(update))
            .await
    }

    async fn delete_campaign(&self, id: &str) -> CallResult<()> {
        self.send_unit(Method::DELETE, &format!("campaigns/{}", id), None::<&()>)
            .await
    }

    async fn add_note(&self, id: &str, draft: &NoteDraft) -> CallResult<NoteReceipt> {
        self.send(Method::POST, &format!("campaigns/{}/notes", id), Some(draft))
            .await
    }

    async fn add_document(&self, id: &str, draft: &DocumentDraft) -> CallResult<DocumentReceipt> {
        self.send(
            Method::POST,
            &format!("campaigns/{}/documents", id),
            Some(draft),
        )
        .await
    }

    async fn add_media(&self, id: &str, draft: &MediaDraft) -> CallResult<MediaReceipt> {
        self.send(Method::POST, &format!("campaigns/{}/media", id), Some(draft))
            .await
    }
}
