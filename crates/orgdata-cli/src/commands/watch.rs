//! Watch command - keep the document loaded until interrupted

use anyhow::Result;
use orgdata_core::{FileDataSource, Service};
use tokio_util::sync::CancellationToken;

pub(crate) async fn execute(source: &FileDataSource) -> Result<()> {
    let service = Service::new();
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
        }
        interrupt.cancel();
    });

    tracing::info!(
        source = %source,
        poll_interval_secs = source.poll_interval().as_secs(),
        "watching data source"
    );
    service.start_watcher(source, cancel).await?;

    let version = service.version();
    println!(
        "stopped; last load at {} ({} employees, {} orgs)",
        version.load_time.to_rfc3339(),
        version.employee_count,
        version.org_count
    );
    Ok(())
}
