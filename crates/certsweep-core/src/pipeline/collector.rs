//! Result collector: the pipeline's sink

use tokio::sync::mpsc;

use crate::model::{ScanReport, ServiceProbeResult};

/// Drain `results` into a report, in arrival order.
pub async fn collect_results(mut results: mpsc::Receiver<ServiceProbeResult>) -> ScanReport {
    let mut report = ScanReport::default();
    while let Some(row) = results.recv().await {
        report.results.push(row);
    }
    report
}
