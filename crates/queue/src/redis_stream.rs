//! Redis Streams queue.
//!
//! Each queue is one stream read through a consumer group. New entries are
//! read with `XREADGROUP ... >`; entries left pending longer than the
//! visibility timeout are taken over with `XAUTOCLAIM`, which is how a
//! crashed or failed unit gets redelivered. Acknowledging issues `XACK` and
//! then `XDEL` so the stream does not grow without bound.

use async_trait::async_trait;
use augment_core::{Error, Result};
use redis::aio::MultiplexedConnection;
use redis::{Client, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::queue::{Delivery, MessageQueue};

/// Entry field holding the message body.
const BODY_FIELD: &str = "body";

pub struct RedisStreamQueue {
    client: Client,
    stream: String,
    group: String,
    consumer: String,
    visibility_timeout: Duration,
    /// Commands other than the blocking read
    connection: RwLock<Option<MultiplexedConnection>>,
    /// Dedicated to `XREADGROUP BLOCK` so sends are never queued behind it
    read_connection: RwLock<Option<MultiplexedConnection>>,
    group_ready: AtomicBool,
}

impl RedisStreamQueue {
    pub fn new(
        url: &str,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
        visibility_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::queue(format!("Invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            visibility_timeout,
            connection: RwLock::new(None),
            read_connection: RwLock::new(None),
            group_ready: AtomicBool::new(false),
        })
    }

    async fn connect(&self, slot: &RwLock<Option<MultiplexedConnection>>) -> Result<MultiplexedConnection> {
        if let Some(conn) = slot.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = slot.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| Error::queue(format!("Failed to connect to redis: {}", e)))?;
        info!(stream = %self.stream, "Connected to redis stream");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn command_connection(&self) -> Result<MultiplexedConnection> {
        let mut conn = self.connect(&self.connection).await?;
        self.ensure_group(&mut conn).await?;
        Ok(conn)
    }

    /// Creates the consumer group (and stream) once; an existing group is fine.
    async fn ensure_group(&self, conn: &mut MultiplexedConnection) -> Result<()> {
        if self.group_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(conn)
            .await;

        match created {
            Ok(()) => info!(stream = %self.stream, group = %self.group, "Created consumer group"),
            Err(e) if e.code() == Some("BUSYGROUP") => {}
            Err(e) => return Err(self.on_error("XGROUP CREATE", e).await),
        }

        self.group_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn on_error(&self, op: &str, e: redis::RedisError) -> Error {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            *self.connection.write().await = None;
            *self.read_connection.write().await = None;
        }
        Error::queue(format!("{} on {}: {}", op, self.stream, e))
    }

    /// Pending entries idle past the visibility timeout, claimed for us.
    async fn claim_stale(&self, max: usize) -> Result<Vec<Delivery>> {
        let mut conn = self.command_connection().await?;
        let reply: redis::RedisResult<Value> = redis::cmd("XAUTOCLAIM")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(self.visibility_timeout.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(max)
            .query_async(&mut conn)
            .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return Err(self.on_error("XAUTOCLAIM", e).await),
        };

        // [next-cursor, [entry, ...], (deleted ids)]
        let entries = match reply {
            Value::Bulk(mut parts) if parts.len() >= 2 => parts.swap_remove(1),
            _ => return Ok(Vec::new()),
        };
        let deliveries = parse_entries(entries);
        if !deliveries.is_empty() {
            warn!(stream = %self.stream, count = deliveries.len(), "Reclaimed stale deliveries");
        }
        Ok(deliveries)
    }

    async fn read_new(&self, max: usize, wait: Duration) -> Result<Vec<Delivery>> {
        // group must exist before the blocking read
        self.command_connection().await?;
        let mut conn = self.connect(&self.read_connection).await?;

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(max);
        // BLOCK 0 waits forever
        if !wait.is_zero() {
            cmd.arg("BLOCK").arg(wait.as_millis().max(1) as u64);
        }
        let reply: redis::RedisResult<Value> = cmd
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut conn)
            .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return Err(self.on_error("XREADGROUP", e).await),
        };

        // Nil on timeout, else [[stream, [entry, ...]]]
        let streams = match reply {
            Value::Bulk(streams) => streams,
            _ => return Ok(Vec::new()),
        };

        let mut deliveries = Vec::new();
        for stream in streams {
            if let Value::Bulk(mut pair) = stream {
                if pair.len() == 2 {
                    deliveries.extend(parse_entries(pair.swap_remove(1)));
                }
            }
        }
        Ok(deliveries)
    }
}

/// Parses `[[id, [field, value, ...]], ...]`; entries deleted while pending
/// come back as nil and are skipped.
fn parse_entries(entries: Value) -> Vec<Delivery> {
    let Value::Bulk(entries) = entries else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let Value::Bulk(parts) = entry else {
                return None;
            };
            let mut parts = parts.into_iter();
            let id = match parts.next()? {
                Value::Data(id) => String::from_utf8_lossy(&id).into_owned(),
                _ => return None,
            };
            let Value::Bulk(fields) = parts.next()? else {
                return None;
            };

            let body = fields.chunks(2).find_map(|kv| match kv {
                [Value::Data(k), Value::Data(v)] if k.as_slice() == BODY_FIELD.as_bytes() => {
                    Some(String::from_utf8_lossy(v).into_owned())
                }
                _ => None,
            });

            match body {
                Some(body) => Some(Delivery {
                    receipt: id.clone(),
                    id,
                    body,
                }),
                None => {
                    warn!(id = %id, "Stream entry without body field");
                    // still hand it out so it can be acknowledged as poison
                    Some(Delivery {
                        receipt: id.clone(),
                        id,
                        body: String::new(),
                    })
                }
            }
        })
        .collect()
}

#[async_trait]
impl MessageQueue for RedisStreamQueue {
    fn name(&self) -> &str {
        &self.stream
    }

    async fn send(&self, body: &str) -> Result<String> {
        let mut conn = self.command_connection().await?;
        let result: redis::RedisResult<String> = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(id) => {
                debug!(stream = %self.stream, id = %id, "Message sent");
                Ok(id)
            }
            Err(e) => Err(self.on_error("XADD", e).await),
        }
    }

    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<Delivery>> {
        let reclaimed = self.claim_stale(max).await?;
        if !reclaimed.is_empty() {
            return Ok(reclaimed);
        }
        self.read_new(max, wait).await
    }

    async fn ack(&self, receipt: &str) -> Result<()> {
        let mut conn = self.command_connection().await?;
        let result: redis::RedisResult<(i64, i64)> = redis::pipe()
            .cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(receipt)
            .cmd("XDEL")
            .arg(&self.stream)
            .arg(receipt)
            .query_async(&mut conn)
            .await;

        match result {
            Ok((acked, _)) => {
                if acked == 0 {
                    warn!(stream = %self.stream, id = %receipt, "Ack for message not pending");
                }
                Ok(())
            }
            Err(e) => Err(self.on_error("XACK", e).await),
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connect(&self.connection).await?;
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(self.on_error("PING", e).await),
        }
    }
}
