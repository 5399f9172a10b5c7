//! API server command: `course-forge serve`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use course_forge::config::{CliOverrides, CourseForgeConfig};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    let config = CourseForgeConfig::resolve(config_path, &CliOverrides { port, db_path, dev })?;
    course_forge::logging::init_logging(&config.logging)?;

    for warning in config.validate() {
        tracing::warn!(warning = %warning, "Configuration warning");
    }

    course_forge::server::start_server(config).await
}
