//! `get-version`: print the version read from project metadata.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::version::resolve_version;

/// Print the resolved version, and nothing else, on stdout
pub(super) async fn execute_get_version(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let provider = args.metadata_provider(config.timeouts);

    let version = resolve_version(&provider).await?;
    println!("{}", version);
    Ok(0)
}
