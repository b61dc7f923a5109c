use std::path::Path;
use anyhow::{anyhow, Result};

use crate::config::clients::ServiceConfig;
use crate::config::proc_loader::file_to_config;

pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    file_to_config(path).await.map_err(|e| anyhow!("Invalid config '{}': {:#}", config_path, e))
}
