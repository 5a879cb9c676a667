//! Context source: the head of the pipeline

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::stream::{send_or_cancel, SharedReceiver, STAGE_CAPACITY};
use crate::model::Context;

/// Emit `contexts` in order, skipping any without a name or namespace.
///
/// The stream closes once every context is emitted or cancellation fires.
pub fn spawn_context_source(
    tasks: &mut JoinSet<()>,
    contexts: Vec<Context>,
    cancel: CancellationToken,
) -> SharedReceiver<Context> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tasks.spawn(async move {
        for ctx in contexts {
            if !ctx.is_scannable() {
                debug!(context = %ctx.name, "Skipping context without name or namespace");
                continue;
            }
            if !send_or_cancel(&tx, ctx, &cancel).await {
                debug!("Context source stopping early");
                return;
            }
        }
    });

    SharedReceiver::new(rx)
}
