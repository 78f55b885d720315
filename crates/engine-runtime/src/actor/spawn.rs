use crate::actor::{Actor, ActorContext, ActorRef};
use std::fmt::Debug;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error};

/// Run `actor` on its own Tokio task.
///
/// The task ends once every [`ActorRef`] is gone and queued messages are
/// handled, or when the returned handle is aborted.
pub fn spawn_actor<M, A>(
    ctx: ActorContext,
    mailbox_capacity: usize,
    mut actor: A,
) -> (ActorRef<M>, JoinHandle<()>)
where
    A: Actor<M>,
    M: Send + Debug + 'static,
{
    let (tx, mut rx) = mpsc::channel::<M>(mailbox_capacity.max(1));
    let actor_ref = ActorRef::new(ctx.clone(), tx);

    let handle = tokio::spawn(async move {
        if let Err(e) = actor.on_start(&ctx).await {
            error!(actor = %ctx.name(), query_id = %ctx.query_id(), ?e, "worker failed to start");
            return;
        }

        let mut handled = 0usize;
        while let Some(msg) = rx.recv().await {
            handled += 1;
            if let Err(e) = actor.handle(msg, &ctx).await {
                error!(actor = %ctx.name(), query_id = %ctx.query_id(), ?e, "worker failed to handle message");
            }
        }

        debug!(actor = %ctx.name(), handled, "mailbox closed");
        if let Err(e) = actor.on_stop(&ctx).await {
            error!(actor = %ctx.name(), query_id = %ctx.query_id(), ?e, "worker failed to stop");
        }
    });

    (actor_ref, handle)
}
