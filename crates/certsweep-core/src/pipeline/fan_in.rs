//! Fan-in: merge every per-context probe stream into one

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::stream::{recv_or_cancel, send_or_cancel, STAGE_CAPACITY};

/// Merge `inputs` into a single stream.
///
/// One forwarding worker per input; each holds a clone of the output sender,
/// so the merged stream closes exactly when the last forwarder exits. A
/// forwarder exits when its input closes or cancellation fires. Order is kept
/// within an input, interleaving across inputs is arbitrary.
pub fn spawn_fan_in<T: Send + 'static>(
    tasks: &mut JoinSet<()>,
    inputs: Vec<mpsc::Receiver<T>>,
    cancel: CancellationToken,
) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    for mut input in inputs {
        let tx = tx.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            while let Some(item) = recv_or_cancel(&mut input, &cancel).await {
                if !send_or_cancel(&tx, item, &cancel).await {
                    return;
                }
            }
        });
    }

    rx
}
