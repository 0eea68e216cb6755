//! Result cursors
//!
//! A [`Cursor`] wraps the descriptor returned by `find` and hands documents
//! out one at a time. When the local batch runs dry and the server still
//! holds the cursor open, the next pull issues a `getMore` through the
//! dispatcher. That refetch is also available directly as
//! [`Cursor::refill`], so the points where a network round trip happens are
//! visible to callers and tests.
//!
//! States:
//! - [`CursorState::Open`]: the server cursor is live; documents may also be buffered
//! - [`CursorState::BufferedOnly`]: the server is done, buffered documents remain
//! - [`CursorState::Exhausted`]: nothing buffered, nothing on the server (terminal)

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use mongodb::bson::Document;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::command;
use crate::error::Result;
use crate::protocol::CommandDispatcher;

mod descriptor;

pub use descriptor::{CursorDescriptor, CursorId, Namespace};


/// Position of a cursor in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    BufferedOnly,
    Exhausted,
}

/// Single-consumer, pull-based sequence of documents decoded as `T`
///
/// Not restartable. Dropping a cursor whose server side is still open leaks
/// that server cursor until the server reclaims it (never, when
/// `noCursorTimeout` was requested); call [`Cursor::close`] to release it.
pub struct Cursor<T> {
    dispatcher: Arc<dyn CommandDispatcher>,
    id: CursorId,
    namespace: Namespace,
    buffer: VecDeque<Document>,
    batch_size: Option<u32>,
    returned: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Cursor<T> {
    /// Wrap a descriptor; the cursor takes exclusive ownership of it.
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>, descriptor: CursorDescriptor) -> Self {
        Self {
            dispatcher,
            id: descriptor.id,
            namespace: descriptor.namespace,
            buffer: descriptor.batch,
            batch_size: None,
            returned: 0,
            _marker: PhantomData,
        }
    }

    /// Set the `batchSize` sent with each `getMore`
    pub fn with_batch_size(mut self, batch_size: Option<u32>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> CursorState {
        match (self.id.is_live(), self.buffer.is_empty()) {
            (true, _) => CursorState::Open,
            (false, false) => CursorState::BufferedOnly,
            (false, true) => CursorState::Exhausted,
        }
    }

    /// Server cursor id (zero once the server side is closed)
    pub fn id(&self) -> CursorId {
        self.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Number of documents buffered locally
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of documents handed out so far
    pub fn documents_returned(&self) -> u64 {
        self.returned
    }

    /// Fetch the next batch from the server.
    ///
    /// Returns the number of documents added to the local buffer. Does not
    /// dispatch anything when the server cursor is already closed. On
    /// failure the cursor is left exactly as it was, so the call (or
    /// [`Cursor::next`]) can be retried.
    pub async fn refill(&mut self) -> Result<usize> {
        if !self.id.is_live() {
            return Ok(0);
        }

        let command = command::get_more(self.id, &self.namespace.collection, self.batch_size)?;
        let response = self
            .dispatcher
            .command_single(&self.namespace.database, command)
            .await?;
        let descriptor = CursorDescriptor::from_get_more_response(&response)?;

        let fetched = descriptor.batch.len();
        self.id = descriptor.id;
        self.buffer.extend(descriptor.batch);

        debug!(
            namespace = %self.namespace,
            cursor_id = %self.id,
            fetched,
            "refilled cursor batch"
        );

        Ok(fetched)
    }

    /// Release the server cursor and drop buffered documents.
    ///
    /// Sends `killCursors` when the server cursor is live. Afterwards the
    /// cursor is exhausted regardless of what it held. Closing an exhausted
    /// cursor does nothing.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();

        if !self.id.is_live() {
            return Ok(());
        }

        let command = command::kill_cursors(&self.namespace.collection, &[self.id]);
        let id = self.id;
        // the server cursor is abandoned even if killCursors fails
        self.id = CursorId::EXHAUSTED;

        self.dispatcher
            .command_single(&self.namespace.database, command)
            .await?;

        debug!(namespace = %self.namespace, cursor_id = %id, "killed cursor");
        Ok(())
    }
}

impl<T: DeserializeOwned> Cursor<T> {
    /// Pull the next document.
    ///
    /// Returns `Ok(None)` once both the local batch and the server cursor
    /// are exhausted, and keeps returning it on every later call. A document
    /// that does not decode as `T` is consumed and reported as an error; the
    /// following call moves on to the next document.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(doc) = self.buffer.pop_front() {
                let item = mongodb::bson::from_document(doc)?;
                self.returned += 1;
                return Ok(Some(item));
            }

            if !self.id.is_live() {
                return Ok(None);
            }

            self.refill().await?;
        }
    }

    /// Drain every remaining document into a vector
    pub async fn collect_remaining(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(self.buffer.len());
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Turn the cursor into a `Stream` of decoded documents
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await;
            next.map(|item| item.map(|item| (item, cursor)))
        })
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        if self.id.is_live() {
            warn!(
                namespace = %self.namespace,
                cursor_id = %self.id,
                "cursor dropped while still open on the server"
            );
        }
    }
}

/// Manual Debug implementation since the dispatcher is a trait object
impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("buffered", &self.buffer.len())
            .field("batch_size", &self.batch_size)
            .field("returned", &self.returned)
            .finish()
    }
}
