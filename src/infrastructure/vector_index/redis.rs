//! Redis-protocol vector search index (MemoryDB, Redis Stack)

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{Client, Cmd, FromRedisValue, RedisError, RedisResult, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::reply::{parse_search_reply, ANSWER_FIELD, SCORE_FIELD, TAG_FIELD};
use crate::domain::embedding::encode_f32_le;
use crate::domain::{CacheEntry, DomainError, IndexMatch, IndexStatus, RangeQuery, VectorIndex};

const VECTOR_FIELD: &str = "vector";
const QUESTION_FIELD: &str = "question";
const CREATED_AT_FIELD: &str = "created_at";

/// Connection settings for the Redis index
#[derive(Debug, Clone)]
pub struct RedisIndexConfig {
    /// `redis://` or `rediss://` URL
    pub url: String,
    pub cluster: bool,
    pub index_name: String,
    /// Documents under this prefix are indexed
    pub key_prefix: String,
    pub dimension: usize,
    /// Ask the server for `SORTBY`; MemoryDB's FT.SEARCH does not accept it
    pub sort_by_distance: bool,
}

#[derive(Clone)]
enum Connection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

impl Connection {
    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> RedisResult<T> {
        match self {
            Connection::Single(conn) => cmd.query_async(&mut conn.clone()).await,
            Connection::Cluster(conn) => cmd.query_async(&mut conn.clone()).await,
        }
    }
}

/// Vector index backed by the Redis search module.
///
/// The connection is opened on first use, so an unreachable server surfaces
/// as failed index calls rather than a failed start-up.
pub struct RedisVectorIndex {
    config: RedisIndexConfig,
    connection: OnceCell<Connection>,
}

impl fmt::Debug for RedisVectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisVectorIndex")
            .field("index_name", &self.config.index_name)
            .field("cluster", &self.config.cluster)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisVectorIndex {
    pub fn new(config: RedisIndexConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> RedisResult<&Connection> {
        self.connection
            .get_or_try_init(|| async {
                if self.config.cluster {
                    let client = ClusterClient::new(vec![self.config.url.as_str()])?;
                    let conn = client.get_async_connection().await?;
                    info!(index = %self.config.index_name, "Connected to Redis cluster");
                    Ok(Connection::Cluster(conn))
                } else {
                    let client = Client::open(self.config.url.as_str())?;
                    let conn = ConnectionManager::new(client).await?;
                    info!(index = %self.config.index_name, "Connected to Redis");
                    Ok(Connection::Single(conn))
                }
            })
            .await
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> RedisResult<T> {
        self.connection().await?.query(cmd).await
    }

    fn search_command(&self, embedding: &[f32], query: &RangeQuery) -> Cmd {
        let mut cmd = redis::cmd("FT.SEARCH");
        cmd.arg(&self.config.index_name)
            .arg(format!(
                "@{}:[VECTOR_RANGE $radius $vec]=>{{$YIELD_DISTANCE_AS: {}}}",
                VECTOR_FIELD, SCORE_FIELD
            ))
            .arg("PARAMS")
            .arg(4)
            .arg("radius")
            .arg(query.radius.to_string())
            .arg("vec")
            .arg(encode_f32_le(embedding));

        if self.config.sort_by_distance {
            cmd.arg("SORTBY").arg(SCORE_FIELD).arg("ASC");
        }

        cmd.arg("RETURN")
            .arg(3)
            .arg(ANSWER_FIELD)
            .arg(TAG_FIELD)
            .arg(SCORE_FIELD)
            .arg("LIMIT")
            .arg(0)
            .arg(query.limit)
            .arg("DIALECT")
            .arg(2);
        cmd
    }

    fn hset_command(&self, entry: &CacheEntry) -> Cmd {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(entry.key())
            .arg(VECTOR_FIELD)
            .arg(encode_f32_le(entry.embedding()))
            .arg(ANSWER_FIELD)
            .arg(entry.answer())
            .arg(TAG_FIELD)
            .arg(entry.tag())
            .arg(CREATED_AT_FIELD)
            .arg(entry.created_at().timestamp());

        if let Some(question) = entry.question() {
            cmd.arg(QUESTION_FIELD).arg(question);
        }

        cmd
    }

    fn create_command(&self) -> Cmd {
        let mut cmd = redis::cmd("FT.CREATE");
        cmd.arg(&self.config.index_name)
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg(1)
            .arg(&self.config.key_prefix)
            .arg("SCHEMA")
            .arg(ANSWER_FIELD)
            .arg("TEXT")
            .arg(TAG_FIELD)
            .arg("TAG")
            .arg(VECTOR_FIELD)
            .arg("VECTOR")
            .arg("HNSW")
            .arg(6)
            .arg("TYPE")
            .arg("FLOAT32")
            .arg("DIM")
            .arg(self.config.dimension)
            .arg("DISTANCE_METRIC")
            .arg("COSINE");
        cmd
    }
}

fn is_transport_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
}

#[async_trait]
impl VectorIndex for RedisVectorIndex {
    async fn range_search(
        &self,
        embedding: &[f32],
        query: &RangeQuery,
    ) -> Result<Vec<IndexMatch>, DomainError> {
        let reply: Value = self
            .query(&self.search_command(embedding, query))
            .await
            .map_err(|e| DomainError::index_read(format!("FT.SEARCH failed: {}", e)))?;

        let matches = parse_search_reply(reply)?;

        debug!(
            index = %self.config.index_name,
            radius = query.radius,
            results = matches.len(),
            "Range search completed"
        );

        Ok(matches)
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), DomainError> {
        if entry.dimensions() != self.config.dimension {
            return Err(DomainError::index_write(format!(
                "Embedding has {} dimensions, index expects {}",
                entry.dimensions(),
                self.config.dimension
            )));
        }

        let _: i64 = self
            .query(&self.hset_command(entry))
            .await
            .map_err(|e| DomainError::index_write(format!("HSET {} failed: {}", entry.key(), e)))?;

        if let Some(ttl) = entry.ttl() {
            let _: i64 = self
                .query(redis::cmd("EXPIRE").arg(entry.key()).arg(ttl.as_secs().max(1)))
                .await
                .map_err(|e| {
                    DomainError::index_write(format!("EXPIRE {} failed: {}", entry.key(), e))
                })?;
        }

        debug!(key = %entry.key(), "Stored cache entry");
        Ok(())
    }

    async fn ensure_index(&self) -> Result<IndexStatus, DomainError> {
        let name = &self.config.index_name;

        match self.query::<Value>(redis::cmd("FT.INFO").arg(name)).await {
            Ok(_) => {
                info!(index = %name, "Index already exists");
                return Ok(IndexStatus::AlreadyExists);
            }
            Err(e) if is_transport_error(&e) => {
                return Err(DomainError::index_read(format!("FT.INFO failed: {}", e)));
            }
            Err(e) => {
                debug!(index = %name, error = %e, "Index not found");
            }
        }

        let _: Value = self
            .query(&self.create_command())
            .await
            .map_err(|e| DomainError::index_write(format!("FT.CREATE failed: {}", e)))?;

        info!(
            index = %name,
            dimension = self.config.dimension,
            prefix = %self.config.key_prefix,
            "Created vector index"
        );
        Ok(IndexStatus::Created)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        let _: String = self.query(&redis::cmd("PING")).await.map_err(|e| {
            warn!(error = %e, "Vector index health check failed");
            DomainError::index_read(format!("PING failed: {}", e))
        })?;
        Ok(())
    }
}
