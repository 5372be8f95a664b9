use std::sync::Arc;
use clap::Parser;
use log::{info, warn};
use astrax::config::AstraConfig;
use astrax::providers::{OpenRouterClient, Transport};
use astrax::relay::{router, RelayState};
use astrax::tracker::RequestDefaults;

#[derive(Parser)]
#[command(name = "astrax-proxy", about = "ASTRA-X chat function server")]
struct Args
{   /// JSON config file
    #[arg(short, long, env = "ASTRAX_CONFIG")]
    config: Option<String>

  , #[arg(short, long, env = "ASTRAX_PROXY_PORT", default_value_t = 8787)]
    port: u16
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{   env_logger::init();
    let args = Args::parse();

    let config = match &args.config
    {   Some(p) => AstraConfig::load(p)?
      , None => AstraConfig::default()
    }.apply_env();
    config.validate()?;

    // Requests still get a proper {error} reply when the key is missing
    let transport: Option<Arc<dyn Transport>>
      = match OpenRouterClient::from_env(&config.transport)
      {   Ok(client) => Some(Arc::new(client) as Arc<dyn Transport>)
        , Err(e) => {
            warn!("{}; every request will fail", e);
            None
          }
      };

    let state = Arc::new(RelayState
    {   transport
      , persona: config.persona
      , defaults: RequestDefaults::from(&config.transport)
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("Chat function listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
