//! Remote-log adapter: a fixed pool of handles to an externally operated
//! ordered log service, dispatched round-robin.
//!
//! An individual handle may be effectively sequential, so one process
//! gains append/read parallelism by spreading calls across the pool. The
//! external service owns GSN assignment and must satisfy the ordering
//! guarantees of the [`SharedLog`] contract; the adapter's own job is
//! limited to pool management, dispatch and record encoding.

use std::sync::Arc;

use async_trait::async_trait;
use logstore_common::{
    CommitRecord, DataRecord, Error, Gsn, RecordRef, RemoteLogConfig, Result,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::codec::{self, LogEntry};
use crate::{ReplayHandler, SharedLog};

/// One independent handle to the external log service.
///
/// Handles must tolerate concurrent callers: once the pool has selected a
/// handle it is used without further serialization, concurrently with
/// every other handle.
#[async_trait]
pub trait LogHandle: Send + Sync {
    /// Appends one opaque payload; returns the assigned GSN and shard.
    async fn append(&self, payload: Vec<u8>) -> Result<(Gsn, u32)>;

    /// Reads the payload stored at `(gsn, shard_id)`.
    async fn read(&self, gsn: Gsn, shard_id: u32) -> Result<Vec<u8>>;

    /// Oldest retained GSN at the service.
    async fn head(&self) -> Result<Gsn>;

    /// Newest assigned GSN at the service.
    async fn tail(&self) -> Result<Gsn>;
}

/// Pooled [`SharedLog`] backend over an external ordered log service.
pub struct RemoteLog {
    handles: Vec<Arc<dyn LogHandle>>,
    /// Round-robin cursor; the only shared mutable state in the adapter.
    next: Mutex<usize>,
}

impl std::fmt::Debug for RemoteLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLog")
            .field("handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl RemoteLog {
    /// Builds an adapter over an existing set of handles.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `handles` is empty.
    pub fn new(handles: Vec<Arc<dyn LogHandle>>) -> Result<Self> {
        if handles.is_empty() {
            return Err(Error::configuration("remote log pool must not be empty"));
        }
        Ok(Self {
            handles,
            next: Mutex::new(0),
        })
    }

    /// Builds an HTTP-backed pool from configuration: `pool_size` handles
    /// spread over the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no endpoints are configured, or a
    /// transport error if a client cannot be constructed.
    pub fn from_config(config: &RemoteLogConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(Error::configuration("no remote log endpoints configured"));
        }
        let pool_size = config.pool_size.max(1);
        let mut handles: Vec<Arc<dyn LogHandle>> = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let endpoint = &config.endpoints[i % config.endpoints.len()];
            handles.push(Arc::new(HttpLogHandle::new(endpoint.clone())?));
        }
        debug!(pool_size, endpoints = config.endpoints.len(), "remote log pool ready");
        Self::new(handles)
    }

    /// Number of handles in the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.handles.len()
    }

    /// Advances the cursor and returns the next handle. Only the cursor is
    /// lock-protected; the returned handle is used concurrently with the
    /// rest of the pool.
    fn pick(&self) -> Arc<dyn LogHandle> {
        let mut next = self.next.lock();
        let handle = Arc::clone(&self.handles[*next]);
        *next = (*next + 1) % self.handles.len();
        handle
    }
}

#[async_trait]
impl SharedLog for RemoteLog {
    async fn append_data(&self, rec: DataRecord) -> Result<RecordRef> {
        let payload = codec::encode(&LogEntry::Data(rec))?;
        let (gsn, shard_id) = self.pick().append(payload).await?;
        Ok(RecordRef { gsn, shard_id })
    }

    async fn append_commit(&self, rec: CommitRecord) -> Result<Gsn> {
        let payload = codec::encode(&LogEntry::Commit(rec))?;
        let (gsn, _shard_id) = self.pick().append(payload).await?;
        Ok(gsn)
    }

    async fn read_data(&self, r: RecordRef) -> Result<DataRecord> {
        let payload = self.pick().read(r.gsn, r.shard_id).await?;
        match codec::decode(&payload)? {
            LogEntry::Data(rec) => Ok(rec),
            // The ref addresses a commit record, not data.
            LogEntry::Commit(_) => Err(Error::not_found(r.gsn, r.shard_id)),
        }
    }

    /// Scans `[from, to]` with shardless reads. Commit records are served
    /// shardlessly by the external service; GSNs holding data records or
    /// nothing at all are skipped.
    async fn replay_commits(
        &self,
        from: Gsn,
        to: Gsn,
        handler: &mut ReplayHandler<'_>,
    ) -> Result<()> {
        if from > to {
            return Ok(());
        }
        for gsn in from..=to {
            let payload = match self.pick().read(gsn, 0).await {
                Ok(payload) => payload,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(Error::Replay(format!("scan failed at gsn {gsn}: {e}"))),
            };
            match codec::decode(&payload) {
                Ok(LogEntry::Commit(rec)) => handler(gsn, &rec)?,
                Ok(LogEntry::Data(_)) => {}
                Err(e) => return Err(Error::Replay(format!("undecodable record at gsn {gsn}: {e}"))),
            }
        }
        Ok(())
    }

    async fn head(&self) -> Result<Gsn> {
        self.pick().head().await
    }

    async fn tail(&self) -> Result<Gsn> {
        self.pick().tail().await
    }
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    gsn: Gsn,
    #[serde(default)]
    shard_id: u32,
}

#[derive(Debug, Deserialize)]
struct GsnResponse {
    gsn: Gsn,
}

/// [`LogHandle`] over the HTTP API of the external log service.
///
/// The reqwest client multiplexes internally, so the handle is safe for
/// concurrent callers as the pool requires.
pub struct HttpLogHandle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLogHandle {
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LogHandle for HttpLogHandle {
    async fn append(&self, payload: Vec<u8>) -> Result<(Gsn, u32)> {
        let resp = self
            .client
            .post(format!("{}/v1/records", self.base_url))
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::append(format!(
                "log service returned {}",
                resp.status()
            )));
        }
        let body: AppendResponse = resp
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;
        Ok((body.gsn, body.shard_id))
    }

    async fn read(&self, gsn: Gsn, shard_id: u32) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(format!(
                "{}/v1/records/{gsn}?shard={shard_id}",
                self.base_url
            ))
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(gsn, shard_id));
        }
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "log service returned {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn head(&self) -> Result<Gsn> {
        let body: GsnResponse = self
            .client
            .get(format!("{}/v1/head", self.base_url))
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;
        Ok(body.gsn)
    }

    async fn tail(&self) -> Result<Gsn> {
        let body: GsnResponse = self
            .client
            .get(format!("{}/v1/tail", self.base_url))
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;
        Ok(body.gsn)
    }
}
