//! Live "N of M services processed" display

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use certsweep_core::ProgressSnapshot;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                        {pos} of {len} services processed {msg}";

/// Progress bar that follows a scan's snapshot channel.
pub struct ProgressDisplay {
    bar: ProgressBar,
    follower: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Start following `updates`. A disabled display still tracks counts but
    /// draws nothing.
    pub fn spawn(mut updates: watch::Receiver<ProgressSnapshot>, enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };

        let follower = tokio::spawn({
            let bar = bar.clone();
            async move {
                while updates.changed().await.is_ok() {
                    let snapshot = *updates.borrow_and_update();
                    apply(&bar, &snapshot);
                }
            }
        });

        Self { bar, follower }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    /// Stop following and leave the final counts on screen.
    pub fn finish(self, last: &ProgressSnapshot) {
        self.follower.abort();
        apply(&self.bar, last);
        if last.failed_contexts > 0 {
            self.bar
                .finish_with_message(format!("({} contexts failed)", last.failed_contexts));
        } else {
            self.bar.finish();
        }
    }
}

fn apply(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    bar.set_length(snapshot.discovered);
    bar.set_position(snapshot.processed());
}
