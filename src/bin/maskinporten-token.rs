use anyhow::{anyhow, Result};
use clap::Parser;
use maskinporten_client::config::clients::ServiceConfig;
use maskinporten_client::observability::metrics::get_metrics;
use maskinporten_client::utils::config_loader;
use maskinporten_client::utils::logging::{self, LogLevel};
use maskinporten_client::{MaskinportenService, SettingsClientDefinition};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "maskinporten.yaml")]
    config: String,
    /// Client name from the `clients` section; optional when only one client is configured
    #[arg(long, env = "CLIENT")]
    client: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Always request a fresh token
    #[arg(long)]
    bypass_cache: bool,
    /// Dump cache and upstream counters to stderr when done
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Pick client definition
    // -------------------------------

    let (name, definition) = select_client(&service_config, args.client.as_deref())?;

    // -------------------------------
    // 3. Create service
    // -------------------------------

    let mut service = MaskinportenService::new()?;
    if let Some(endpoints) = service_config.settings.endpoints.to_owned() {
        service = service.with_endpoints(endpoints);
    }

    // -------------------------------
    // 4. Fetch (and exchange) token
    // -------------------------------

    info!("fetching token for client '{}'", name);
    let token = service.get_token_for_client(&definition, args.bypass_cache).await?;
    println!("{}", serde_json::to_string_pretty(&token)?);

    if args.print_metrics {
        eprintln!("{}", get_metrics().await?.gather_text()?);
    }

    Ok(())
}

fn select_client(config: &ServiceConfig, name: Option<&str>) -> Result<(String, SettingsClientDefinition)> {
    let (name, client) = match name {
        Some(name) => config
            .clients
            .get_key_value(name)
            .ok_or_else(|| anyhow!("client '{}' is not configured", name))?,
        None if config.clients.len() == 1 => config
            .clients
            .iter()
            .next()
            .ok_or_else(|| anyhow!("no clients configured"))?,
        None => return Err(anyhow!("several clients configured, pick one with --client")),
    };
    Ok((name.to_owned(), SettingsClientDefinition::new(client.to_owned())))
}
