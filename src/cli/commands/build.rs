//! `build`: build and tag the image with a caller-supplied version.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::image::build_image;
use crate::version::Version;

/// Standalone build: no metadata query and no push
pub(super) async fn execute_build(
    args: &Args,
    config: &RuntimeConfig,
    version: &Version,
) -> Result<i32> {
    let release_config = args.release_config(config.timeouts)?;
    let docker = release_config.docker(config.output().clone());

    let reference = build_image(&docker, &release_config.image_name, version).await?;

    config.success_println(&format!("Image {} is available locally", reference));
    Ok(0)
}
