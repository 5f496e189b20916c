// src/remote/client.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::core::attendance::types::AttendanceEvent;
use crate::core::face::FaceEmbedding;
use crate::utils::config::RemoteConfig;

use super::error::RemoteError;
use super::types::{DeviceRow, MatchCandidate, NewAttendanceEvent, NewFaceEmbedding};

/// Seam over the hosted relational store. The recorder, matcher and sync
/// engine all talk to the remote side through this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn match_embedding(
        &self,
        embedding: &FaceEmbedding,
        organization_id: Uuid,
        threshold: f32,
    ) -> Result<Vec<MatchCandidate>, RemoteError>;

    async fn find_attendance_event(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEvent>, RemoteError>;

    async fn insert_attendance_event(
        &self,
        event: &NewAttendanceEvent,
    ) -> Result<AttendanceEvent, RemoteError>;

    async fn upsert_face_embedding(&self, embedding: &NewFaceEmbedding) -> Result<(), RemoteError>;

    async fn fetch_device(&self, device_id: Uuid) -> Result<Option<DeviceRow>, RemoteError>;

    async fn health_check(&self) -> Result<(), RemoteError>;
}

pub struct HostedStoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl HostedStoreClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| RemoteError::Transport(format!("Invalid API key header: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| RemoteError::Transport(format!("Invalid API key header: {}", e)))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, procedure)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let checked = Self::check(response).await?;
        checked
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidPayload(e.to_string()))
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(classify_status(status, message))
    }
}

fn classify_status(status: StatusCode, message: String) -> RemoteError {
    if status == StatusCode::CONFLICT {
        return RemoteError::Conflict;
    }
    RemoteError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RemoteStore for HostedStoreClient {
    async fn match_embedding(
        &self,
        embedding: &FaceEmbedding,
        organization_id: Uuid,
        threshold: f32,
    ) -> Result<Vec<MatchCandidate>, RemoteError> {
        let response = self
            .http
            .post(self.rpc_url("match_face_embedding"))
            .json(&json!({
                "query_embedding": embedding,
                "match_threshold": threshold,
                "org_id": organization_id,
            }))
            .send()
            .await?;

        let candidates: Vec<MatchCandidate> = Self::read_json(response).await?;
        debug!("Similarity search returned {} candidate(s)", candidates.len());
        Ok(candidates)
    }

    async fn find_attendance_event(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEvent>, RemoteError> {
        let response = self
            .http
            .get(self.table_url("attendance_events"))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("branch_id", format!("eq.{}", branch_id)),
                ("date", format!("eq.{}", date)),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<AttendanceEvent> = Self::read_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_attendance_event(
        &self,
        event: &NewAttendanceEvent,
    ) -> Result<AttendanceEvent, RemoteError> {
        let response = self
            .http
            .post(self.table_url("attendance_events"))
            .header("Prefer", "return=representation")
            .json(event)
            .send()
            .await?;

        let mut rows: Vec<AttendanceEvent> = Self::read_json(response).await?;
        if rows.is_empty() {
            return Err(RemoteError::InvalidPayload(
                "Insert returned an empty representation".into(),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn upsert_face_embedding(&self, embedding: &NewFaceEmbedding) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.table_url("face_embeddings"))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(embedding)
            .send()
            .await?;

        Self::check(response).await.map(|_| ())
    }

    async fn fetch_device(&self, device_id: Uuid) -> Result<Option<DeviceRow>, RemoteError> {
        let response = self
            .http
            .get(self.table_url("devices"))
            .query(&[
                ("id", format!("eq.{}", device_id)),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<DeviceRow> = Self::read_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn health_check(&self) -> Result<(), RemoteError> {
        let response = self.http.head(format!("{}/rest/v1/", self.base_url)).send().await?;
        Self::check(response).await.map(|_| ())
    }
}
