//! Dashboard REST API collaborators.
//!
//! The coordinator only sees the [`DashboardApi`] trait; the HTTP client here
//! normalizes the server's `{ success, message, ... }` envelope and maps
//! transport failures to `Network`, non-2xx/application failures to `Server`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::domain::{
    AdjustUnitsRequest, AssignMeterRequest, ChartPeriod, ChartPoint, SummarySnapshot,
};
use crate::error::{Result, SyncError};

/// Abstract fetch/mutation collaborators for the refresh coordinator.
///
/// Fetches carry GET semantics and are safe to call repeatedly; mutations are
/// invoked at most once per user action (the coordinator never retries them).
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_summary(&self) -> Result<SummarySnapshot>;

    async fn fetch_chart(&self, period: ChartPeriod, meter_filter: &str)
        -> Result<Vec<ChartPoint>>;

    async fn assign_meter(&self, req: &AssignMeterRequest) -> Result<()>;

    async fn create_meter(&self, device_id: &str) -> Result<()>;

    async fn admin_adjust_units(&self, req: &AdjustUnitsRequest) -> Result<()>;
}

/// Server response envelope shared by all endpoints
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Deserialize)]
struct EmptyPayload {}

#[derive(Debug, Serialize)]
struct CreateMeterRequest<'a> {
    device_id: &'a str,
}

/// reqwest-backed implementation of [`DashboardApi`]
#[derive(Clone)]
pub struct HttpDashboardApi {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpDashboardApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn auth_header(&self) -> Option<HeaderValue> {
        self.auth_token
            .as_deref()
            .and_then(|t| HeaderValue::from_str(&format!("Bearer {}", t)).ok())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query);
        if let Some(auth) = self.auth_header() {
            req = req.header(AUTHORIZATION, auth);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(auth) = self.auth_header() {
            req = req.header(AUTHORIZATION, auth);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<EmptyPayload>>(&body)
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(SyncError::Server {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(SyncError::Server {
                status: Some(status.as_u16()),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }
        Ok(envelope.payload)
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_summary(&self) -> Result<SummarySnapshot> {
        self.get("/admin/refresh-data", &[]).await
    }

    async fn fetch_chart(
        &self,
        period: ChartPeriod,
        meter_filter: &str,
    ) -> Result<Vec<ChartPoint>> {
        let payload: ChartPayload = self
            .get(
                "/admin/usage-analytics",
                &[
                    ("period", period.to_string()),
                    ("meter", meter_filter.to_string()),
                ],
            )
            .await?;
        Ok(payload.chart_data)
    }

    async fn assign_meter(&self, req: &AssignMeterRequest) -> Result<()> {
        let _: EmptyPayload = self.post("/admin/assign-meter", req).await?;
        Ok(())
    }

    async fn create_meter(&self, device_id: &str) -> Result<()> {
        let _: EmptyPayload = self
            .post("/admin/meters/create", &CreateMeterRequest { device_id })
            .await?;
        Ok(())
    }

    async fn admin_adjust_units(&self, req: &AdjustUnitsRequest) -> Result<()> {
        let _: EmptyPayload = self.post("/admin/topup", req).await?;
        Ok(())
    }
}
