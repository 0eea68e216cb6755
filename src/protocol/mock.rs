//! Scripted dispatcher for tests

use std::collections::VecDeque;

use async_trait::async_trait;
use mongodb::bson::Document;
use tokio::sync::Mutex;

use super::CommandDispatcher;
use super::response::ensure_ok;
use crate::error::{FacadeError, Result};

/// Replays queued responses and records every command it receives.
///
/// Responses go through [`ensure_ok`], so an `ok: 0` document scripts a
/// server-side command failure.
#[derive(Default)]
pub(crate) struct MockDispatcher {
    responses: Mutex<VecDeque<Result<Document>>>,
    commands: Mutex<Vec<(String, Document)>>,
}

impl MockDispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_responses(responses: Vec<Document>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn push_response(&self, response: Document) {
        self.responses.lock().await.push_back(Ok(response));
    }

    pub(crate) async fn push_error(&self, error: FacadeError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Every `(database, command)` pair dispatched so far.
    pub(crate) async fn commands(&self) -> Vec<(String, Document)> {
        self.commands.lock().await.clone()
    }

    pub(crate) async fn command_count(&self) -> usize {
        self.commands.lock().await.len()
    }

    pub(crate) async fn last_command(&self) -> Option<Document> {
        self.commands
            .lock()
            .await
            .last()
            .map(|(_, command)| command.clone())
    }
}

#[async_trait]
impl CommandDispatcher for MockDispatcher {
    async fn command_single(&self, database: &str, command: Document) -> Result<Document> {
        self.commands
            .lock()
            .await
            .push((database.to_string(), command));

        match self.responses.lock().await.pop_front() {
            Some(Ok(response)) => ensure_ok(response),
            Some(Err(error)) => Err(error),
            None => Err(FacadeError::Generic("no scripted response".to_string())),
        }
    }
}
