use std::fmt::{Display, Formatter};
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::future::join_all;
use hashbrown::HashMap;
use object_store::ObjectStore;
use rangeframe_error::RangeFrameResult;
use rangeframe_io::{CancellationSignal, ObjectStoreContainers};
use serde::{Deserialize, Serialize};

use crate::{FetchOptions, OutputFrame, RemoteTableFetch, StoreSettings};

/// The per-query model: which object of the configured bucket to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryModel {
    pub path: String,
}

/// One query as sent by the host, its model still encoded as JSON.
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub ref_id: String,
    pub json: Bytes,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, json: impl Into<Bytes>) -> Self {
        Self {
            ref_id: ref_id.into(),
            json: json.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Ok,
    /// The query itself could not be understood.
    BadRequest,
    /// Reading the table failed.
    Unknown,
}

/// The outcome of one query: frames on success, a message otherwise.
#[derive(Debug, Clone)]
pub struct DataResponse {
    pub status: QueryStatus,
    pub frames: Vec<OutputFrame>,
    pub error: Option<String>,
}

impl DataResponse {
    pub fn frames(frames: Vec<OutputFrame>) -> Self {
        Self {
            status: QueryStatus::Ok,
            frames,
            error: None,
        }
    }

    pub fn error(status: QueryStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            frames: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Responses keyed by the `ref_id` of the query that produced them.
#[derive(Debug, Clone, Default)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
    Error,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Ok => f.write_str("OK"),
            HealthStatus::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }
}

/// Serves table queries against the single bucket named in its [`StoreSettings`].
#[derive(Debug, Clone)]
pub struct Datasource {
    settings: StoreSettings,
    store: Arc<dyn ObjectStore>,
    fetcher: RemoteTableFetch,
}

impl Datasource {
    /// Build the S3 client described by `settings` and serve queries through it.
    pub fn try_new(settings: StoreSettings) -> RangeFrameResult<Self> {
        let store = settings.build_object_store()?;
        Ok(Self::with_store(settings, store))
    }

    /// Serve queries through an already built client for the configured bucket.
    pub fn with_store(settings: StoreSettings, store: Arc<dyn ObjectStore>) -> Self {
        log::info!(
            "initializing datasource region={} bucket={} endpoint={}",
            settings.region,
            settings.bucket,
            settings.endpoint
        );
        let containers = ObjectStoreContainers::new().with_container(&settings.bucket, store.clone());
        Self {
            fetcher: RemoteTableFetch::new(Arc::new(containers)),
            settings,
            store,
        }
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetcher = self.fetcher.with_options(options);
        self
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Run every query of `request` concurrently. A failing query only fails its own
    /// response.
    pub async fn query_data(
        &self,
        request: &QueryDataRequest,
        cancel: &CancellationSignal,
    ) -> QueryDataResponse {
        let responses = join_all(request.queries.iter().map(|query| async move {
            (query.ref_id.clone(), self.query(query, cancel).await)
        }))
        .await;

        QueryDataResponse {
            responses: responses.into_iter().collect(),
        }
    }

    async fn query(&self, query: &DataQuery, cancel: &CancellationSignal) -> DataResponse {
        let model: QueryModel = match serde_json::from_slice(&query.json) {
            Ok(model) => model,
            Err(err) => {
                return DataResponse::error(QueryStatus::BadRequest, format!("json unmarshal: {err}"));
            }
        };
        if model.path.trim().is_empty() {
            return DataResponse::error(QueryStatus::BadRequest, "query path is empty");
        }

        match self
            .fetcher
            .fetch_with_cancel(&self.settings.bucket, &model.path, cancel)
            .await
        {
            Ok(frames) => DataResponse::frames(frames),
            Err(err) => {
                log::warn!("query {} failed: {err}", query.ref_id);
                DataResponse::error(QueryStatus::Unknown, format!("read parquet: {err}"))
            }
        }
    }

    /// Validate the settings, then list at most one object to prove the bucket is reachable.
    pub async fn check_health(&self) -> HealthCheckResult {
        log::info!(
            "health check region={} bucket={} endpoint={}",
            self.settings.region,
            self.settings.bucket,
            self.settings.endpoint
        );
        if let Err(err) = self.settings.validate() {
            return HealthCheckResult::error(err.to_string());
        }

        let mut listing = self.store.list(None);
        match listing.next().await {
            Some(Err(err)) => {
                log::error!("health check failed to reach the store: {err}");
                HealthCheckResult::error(format!("store connection failed: {err}"))
            }
            None | Some(Ok(_)) => HealthCheckResult::ok(format!(
                "data source is working and bucket {} is reachable",
                self.settings.bucket
            )),
        }
    }
}
