use crate::error::ActorError;
use async_trait::async_trait;
use model::core::identifiers::QueryId;
use std::{fmt::Debug, sync::Arc};
use tokio::sync::mpsc;

/// Identity of a running worker, handed to every callback.
#[derive(Debug, Clone)]
pub struct ActorContext {
    name: Arc<str>,
    query_id: QueryId,
}

impl ActorContext {
    pub fn new(name: impl Into<String>, query_id: QueryId) -> Self {
        Self {
            name: Arc::from(name.into()),
            query_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The query this worker serves.
    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }
}

/// A task that owns its state and works through one mailbox, one message at
/// a time.
///
/// Messages are never handled concurrently, so a worker driven by a mailbox
/// of capacity one has at most one request outstanding.
#[async_trait]
pub trait Actor<M>: Send + 'static
where
    M: Send + Debug + 'static,
{
    async fn on_start(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle(&mut self, msg: M, ctx: &ActorContext) -> Result<(), ActorError>;

    /// Called once the mailbox is closed, i.e. every [`ActorRef`] was dropped.
    async fn on_stop(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }
}

/// Sending half of a worker's mailbox.
#[derive(Debug)]
pub struct ActorRef<M>
where
    M: Send + Debug + 'static,
{
    ctx: ActorContext,
    tx: mpsc::Sender<M>,
}

impl<M> ActorRef<M>
where
    M: Send + Debug + 'static,
{
    pub fn new(ctx: ActorContext, tx: mpsc::Sender<M>) -> Self {
        Self { ctx, tx }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn query_id(&self) -> &QueryId {
        self.ctx.query_id()
    }

    /// Queue a message, waiting for mailbox capacity.
    pub async fn send(&self, msg: M) -> Result<(), ActorError> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| ActorError::MailboxClosed(self.ctx.name().to_string()))
    }
}
