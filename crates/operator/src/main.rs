//! # Genezio Operator
//!
//! Controller binary: initializes the runtime and runs the watch loop until shutdown.

use anyhow::Result;
use genezio_operator::runtime::initialization::initialize;
use genezio_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.managers,
        init_result.deployments,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
