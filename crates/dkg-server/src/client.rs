//! A typed client for P0's HTTP interface, as used by the counterpart
use super::routes::ErrorBody;
use dkg_core::primitives::{
    CommitRequest, CommitResponse, FinalizeRequest, FinalizeResponse, InitRequest, InitResponse,
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// P0 answered with an error object
    #[error("P0 refused the request with {status} ({kind}): {error}")]
    Rejected {
        status: u16,
        kind: String,
        error: String,
    },
}

impl ClientError {
    /// The machine-readable kind P0 reported, if it answered
    pub fn kind(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { kind, .. } => Some(kind.as_str()),
            ClientError::Http(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DkgClient {
    http: reqwest::Client,
    base_url: String,
}

impl DkgClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    pub async fn init(&self, req: &InitRequest) -> ClientResult<InitResponse> {
        self.post("/init_dkg", req).await
    }

    pub async fn commit(&self, req: &CommitRequest) -> ClientResult<CommitResponse> {
        self.post("/commit", req).await
    }

    pub async fn finalize(&self, req: &FinalizeRequest) -> ClientResult<FinalizeResponse> {
        self.post("/finalize_dkg", req).await
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> ClientResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let text = resp.text().await?;
        let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
            error: text.clone(),
            kind: "unknown".to_owned(),
        });
        tracing::warn!(%status, kind = %body.kind, path, "request refused");
        Err(ClientError::Rejected {
            status: status.as_u16(),
            kind: body.kind,
            error: body.error,
        })
    }
}
