use avifpress_api::{setup, telemetry};
use avifpress_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;
    let (_state, router, _sweeper) = setup::initialize_app(config.clone())?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
