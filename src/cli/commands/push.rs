//! `push`: resolve the version, build it, push it.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::pipeline::release;

/// Run the full release pipeline
pub(super) async fn execute_push(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let release_config = args.release_config(config.timeouts)?;
    let metadata = release_config.metadata_provider();
    let docker = release_config.docker(config.output().clone());

    config.progress(&format!(
        "Releasing {} (version from project metadata)",
        release_config.image_name
    ));

    let outcome = release(&release_config.image_name, &metadata, &docker, &docker).await?;

    config.success_println(&format!(
        "Released {} in {}s",
        outcome.reference,
        outcome.elapsed().num_seconds()
    ));
    Ok(0)
}
