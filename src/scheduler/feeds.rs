//! External insight feeds.
//!
//! A feed hands out [`FeedMessage`]s in batches and expects each one to be
//! acknowledged once the ingest loop is done with it. Messages carry the raw
//! insight as a JSON document.

use std::collections::HashSet;
use std::future::poll_fn;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{IngestError, IngestResult};
use crate::insights::{InsightData, RawInsight};

/// One undecoded message from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    /// Feed-scoped id used for acknowledgement.
    pub id: String,
    /// JSON document describing one raw insight.
    pub payload: String,
}

/// A source of raw insight messages with at-least-once delivery.
#[async_trait]
pub trait InsightFeed: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Wait up to `timeout` for the first message, then return it together
    /// with whatever else is already available, at most `max` in total.
    /// An empty batch means nothing arrived in time; `None` means the feed
    /// is exhausted and will never yield again.
    async fn poll(&mut self, max: usize, timeout: Duration)
        -> IngestResult<Option<Vec<FeedMessage>>>;

    /// Acknowledge a message returned by [`InsightFeed::poll`].
    async fn ack(&mut self, id: &str) -> IngestResult<()>;
}

// ============================================================================
// Message decoding
// ============================================================================

fn non_empty_str<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Keys accepted for the session id, in lookup order.
const SESSION_KEYS: [&str; 4] = ["session_id", "sessionId", "round_id", "roundId"];

/// Decode a feed payload into a raw insight.
///
/// The session id is read from `session_id`, falling back to `round_id`.
/// Missing `source` and `type` become `"unknown"`; a missing or non-object
/// `data` becomes empty. An optional `category` string overrides the
/// producer mapping when it names a known category.
pub fn parse_feed_message(payload: &str) -> IngestResult<RawInsight> {
    let value: Value = serde_json::from_str(payload).map_err(|e| IngestError::Malformed {
        message: format!("invalid JSON: {}", e),
    })?;

    let Value::Object(mut object) = value else {
        return Err(IngestError::Malformed {
            message: "payload is not a JSON object".to_string(),
        });
    };

    let session_id = SESSION_KEYS
        .iter()
        .find_map(|key| non_empty_str(&object, key))
        .ok_or(IngestError::MissingSession)?
        .to_string();
    let source = non_empty_str(&object, "source").unwrap_or("unknown").to_string();
    let insight_type = non_empty_str(&object, "type").unwrap_or("unknown").to_string();
    let category = non_empty_str(&object, "category").and_then(|s| s.parse().ok());

    let data = match object.remove("data") {
        Some(Value::Object(map)) => InsightData::from(map),
        _ => InsightData::new(),
    };

    let mut insight = RawInsight::new(session_id, source, insight_type, data);
    insight.category = category;
    Ok(insight)
}

// ============================================================================
// In-process channel feed
// ============================================================================

/// Feed backed by an in-process channel. Producers hold the sender returned
/// by [`ChannelFeed::new`]; the feed is exhausted once every sender is
/// dropped.
#[derive(Debug)]
pub struct ChannelFeed {
    name: String,
    rx: mpsc::Receiver<String>,
    next_id: u64,
    pending: HashSet<String>,
}

impl ChannelFeed {
    pub fn new(name: impl Into<String>, capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let feed = Self {
            name: name.into(),
            rx,
            next_id: 0,
            pending: HashSet::new(),
        };
        (tx, feed)
    }

    /// Ids delivered but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn deliver(&mut self, payload: String) -> FeedMessage {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.pending.insert(id.clone());
        FeedMessage { id, payload }
    }
}

#[async_trait]
impl InsightFeed for ChannelFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> IngestResult<Option<Vec<FeedMessage>>> {
        let first = match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(_) => return Ok(Some(Vec::new())),
        };

        let mut messages = vec![self.deliver(first)];
        while messages.len() < max {
            match self.rx.try_recv() {
                Ok(payload) => messages.push(self.deliver(payload)),
                Err(_) => break,
            }
        }

        Ok(Some(messages))
    }

    async fn ack(&mut self, id: &str) -> IngestResult<()> {
        if self.pending.remove(id) {
            Ok(())
        } else {
            Err(IngestError::Feed {
                feed: self.name.clone(),
                message: format!("unknown message id {}", id),
            })
        }
    }
}

// ============================================================================
// JSON-lines feed
// ============================================================================

/// Feed reading one JSON document per line from any buffered reader (file,
/// FIFO, pipe). Message ids are 1-based line numbers; blank lines are
/// skipped. End of input exhausts the feed.
pub struct JsonLinesFeed<R> {
    name: String,
    lines: Lines<R>,
    line_no: u64,
    committed: u64,
    exhausted: bool,
}

impl JsonLinesFeed<BufReader<File>> {
    /// Open a file feed named after its path.
    pub async fn open(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| IngestError::Feed {
            feed: path.display().to_string(),
            message: format!("failed to open: {}", e),
        })?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesFeed<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            line_no: 0,
            committed: 0,
            exhausted: false,
        }
    }

    /// Highest acknowledged line number.
    pub fn committed_offset(&self) -> u64 {
        self.committed
    }

    /// Record one read: a non-blank line becomes a message, end of input
    /// exhausts the feed.
    fn accept(
        &mut self,
        read: io::Result<Option<String>>,
        messages: &mut Vec<FeedMessage>,
    ) -> IngestResult<()> {
        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => {
                self.exhausted = true;
                return Ok(());
            }
            Err(e) => {
                return Err(IngestError::Feed {
                    feed: self.name.clone(),
                    message: format!("read failed: {}", e),
                })
            }
        };

        self.line_no += 1;
        if !line.trim().is_empty() {
            messages.push(FeedMessage {
                id: self.line_no.to_string(),
                payload: line,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InsightFeed for JsonLinesFeed<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(
        &mut self,
        max: usize,
        timeout: Duration,
    ) -> IngestResult<Option<Vec<FeedMessage>>> {
        if self.exhausted {
            return Ok(None);
        }

        let deadline = Instant::now() + timeout;
        let mut messages = Vec::new();

        // next_line is cancel safe, an interrupted wait loses nothing.
        while messages.is_empty() && !self.exhausted {
            match tokio::time::timeout_at(deadline, self.lines.next_line()).await {
                Ok(read) => self.accept(read, &mut messages)?,
                Err(_) => break,
            }
        }

        // Past the first line, only take what is readable without waiting.
        while !messages.is_empty() && !self.exhausted && messages.len() < max {
            let ready = poll_fn(|cx| match Pin::new(&mut self.lines).poll_next_line(cx) {
                Poll::Ready(read) => Poll::Ready(Some(read)),
                Poll::Pending => Poll::Ready(None),
            })
            .await;
            let Some(read) = ready else { break };
            if let Err(e) = self.accept(read, &mut messages) {
                warn!(feed = %self.name, error = %e, "Read failed after partial batch");
                break;
            }
        }

        if self.exhausted && messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(messages))
    }

    async fn ack(&mut self, id: &str) -> IngestResult<()> {
        let line: u64 = id.parse().map_err(|_| IngestError::Feed {
            feed: self.name.clone(),
            message: format!("invalid message id {}", id),
        })?;
        if line == 0 || line > self.line_no {
            return Err(IngestError::Feed {
                feed: self.name.clone(),
                message: format!("unknown message id {}", id),
            });
        }
        self.committed = self.committed.max(line);
        Ok(())
    }
}
