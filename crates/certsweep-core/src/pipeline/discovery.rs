//! Service discovery stage
//!
//! Pulls contexts off the shared context stream, lists each context's
//! services and emits one unprobed row per service. A listing failure is
//! isolated to its context: it is logged and counted, and the worker moves on
//! to the next context.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stream::{send_or_cancel, SharedReceiver, STAGE_CAPACITY};
use crate::backend::ServiceLister;
use crate::model::{Context, ServiceProbeResult};
use crate::progress::ProgressTracker;

/// Spawn one discovery worker and return its output stream.
pub fn spawn_service_discovery(
    tasks: &mut JoinSet<()>,
    contexts: SharedReceiver<Context>,
    lister: Arc<dyn ServiceLister>,
    progress: ProgressTracker,
    cancel: CancellationToken,
) -> mpsc::Receiver<ServiceProbeResult> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tasks.spawn(async move {
        while let Some(ctx) = contexts.recv(&cancel).await {
            if !ctx.is_scannable() {
                continue;
            }

            let listed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                listed = lister.list_services(&ctx.name, &ctx.namespace) => listed,
            };

            let services = match listed {
                Ok(services) => services,
                Err(e) => {
                    warn!(
                        context = %ctx.name,
                        namespace = %ctx.namespace,
                        error = %e,
                        "Service discovery failed, skipping context"
                    );
                    progress.context_failed();
                    continue;
                }
            };

            info!(
                context = %ctx.name,
                namespace = %ctx.namespace,
                services = services.len(),
                "Discovered services"
            );

            for service in services {
                let row = ServiceProbeResult::discovered(service, &ctx);
                progress.service_discovered();
                if !send_or_cancel(&tx, row, &cancel).await {
                    progress.service_withdrawn();
                    debug!(context = %ctx.name, "Discovery stopping early");
                    return;
                }
            }
        }
    });

    rx
}
