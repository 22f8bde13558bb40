use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::models::document::Document;
use crate::models::job::{JobPayload, QueuedJob};

const QUEUE_KEY: &str = "scrape:jobs";
const PROCESSING_KEY: &str = "scrape:processing";
const REPLY_TTL_SECS: i64 = 300;
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn reply_key(job_id: Uuid) -> String {
    format!("scrape:reply:{job_id}")
}

/// Terminal state of one wait on a submitted job.
///
/// A discriminated outcome rather than an error type: the orchestrator
/// branches exhaustively on it instead of inspecting error messages.
#[derive(Debug)]
pub enum WaitOutcome {
    Completed(Vec<Document>),
    TimedOut,
    Failed(String),
}

/// What the worker pushes onto the job's reply key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobReply {
    Completed { documents: Vec<Document> },
    Failed { error: String },
}

/// Submission side of the job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(
        &self,
        payload: JobPayload,
        job_id: Uuid,
    ) -> Result<Box<dyn JobHandle>, QueueError>;
}

/// Live reference to one submitted job. Created on submission, waited on
/// at most once, and always explicitly removed before being discarded.
#[async_trait]
pub trait JobHandle: Send + Sync {
    fn job_id(&self) -> Uuid;

    /// Block until the worker delivers a reply or `timeout` elapses.
    async fn wait_until_finished(&self, timeout: Duration) -> WaitOutcome;

    /// Remove the job from the queue. Safe to call regardless of how the
    /// wait terminated; removing an already-consumed job is a no-op.
    async fn remove(&self) -> Result<(), QueueError>;
}

/// Redis-backed job queue shared by the gateway and the worker fleet.
pub struct RedisJobQueue {
    client: redis::Client,
}

impl RedisJobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    /// Pull the next job for processing (worker side), moving it to the
    /// processing list so a crashed worker leaves a visible trace.
    pub async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match raw {
            Some(raw) => {
                let job: QueuedJob = serde_json::from_str(&raw).map_err(QueueError::Serialize)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Deliver a worker reply to the job's reply key (worker side).
    pub async fn deliver(&self, job_id: Uuid, reply: &JobReply) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let key = reply_key(job_id);
        let raw = serde_json::to_string(reply).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(&key, raw)
            .await
            .map_err(QueueError::Redis)?;
        // Orphaned replies (gateway gave up waiting) expire on their own.
        conn.expire::<_, ()>(&key, REPLY_TTL_SECS)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Drop a job from the processing list once a reply has been delivered.
    pub async fn finish(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let raw = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &raw)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Current number of pending jobs.
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn submit(
        &self,
        payload: JobPayload,
        job_id: Uuid,
    ) -> Result<Box<dyn JobHandle>, QueueError> {
        let job = QueuedJob { job_id, payload };
        let raw = serde_json::to_string(&job).map_err(QueueError::Serialize)?;

        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &raw)
            .await
            .map_err(QueueError::Redis)?;

        Ok(Box::new(RedisJobHandle {
            client: self.client.clone(),
            job_id,
            raw_payload: raw,
        }))
    }
}

/// Handle bound to one Redis-queued job.
pub struct RedisJobHandle {
    client: redis::Client,
    job_id: Uuid,
    /// Exact serialized payload, needed for LREM-based removal.
    raw_payload: String,
}

impl RedisJobHandle {
    async fn poll_reply(&self) -> Result<JobReply, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let key = reply_key(self.job_id);
        loop {
            let raw: Option<String> = conn.lpop(&key, None).await.map_err(QueueError::Redis)?;
            if let Some(raw) = raw {
                return serde_json::from_str(&raw).map_err(QueueError::Serialize);
            }
            tokio::time::sleep(REPLY_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl JobHandle for RedisJobHandle {
    fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn wait_until_finished(&self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.poll_reply()).await {
            Err(_) => WaitOutcome::TimedOut,
            Ok(Err(e)) => WaitOutcome::Failed(e.to_string()),
            Ok(Ok(JobReply::Completed { documents })) => WaitOutcome::Completed(documents),
            Ok(Ok(JobReply::Failed { error })) => WaitOutcome::Failed(error),
        }
    }

    async fn remove(&self) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        conn.lrem::<_, _, ()>(QUEUE_KEY, 0, &self.raw_payload)
            .await
            .map_err(QueueError::Redis)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 0, &self.raw_payload)
            .await
            .map_err(QueueError::Redis)?;
        conn.del::<_, ()>(reply_key(self.job_id))
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
