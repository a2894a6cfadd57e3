use std::{net::SocketAddr, sync::Arc};

use inside_curl::{
    common::{
        banner::{BannerInfo, print_banner},
        logger,
        types::AnyResult,
    },
    configs::Config,
    gateway::GatewayClient,
    rest::DiscordRest,
    server::{AppState, run_event_loop},
    tracker::EventRouter,
    transport,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    logger::init(&config.logging);
    print_banner(
        &BannerInfo::default(),
        &config.discord.guild_id.to_string(),
        &config.discord.log_channel_id.to_string(),
    );

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AnyResult<()> {
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        shutdown.cancel();
    });

    let state = Arc::new(AppState::new(config));
    let discord = &state.config.discord;
    let rest = Arc::new(DiscordRest::new(&discord.api_base, &discord.token)?);

    let address: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Status server listening on {}", address);

    let app = transport::router(state.clone());
    let server_shutdown = cancel.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            error!("HTTP server error: {}", e);
        }
    });

    let (events_tx, events_rx) = flume::unbounded();
    let router = EventRouter::new(
        state.registry.clone(),
        rest.clone(),
        discord.log_channel_id,
    );
    let event_loop = tokio::spawn(run_event_loop(
        events_rx,
        router,
        rest,
        state.clone(),
        cancel.clone(),
    ));

    let gateway = GatewayClient::new(
        discord.token.clone(),
        discord.gateway_url.clone(),
        discord.guild_id,
        events_tx,
        cancel.clone(),
    );
    let result = gateway.run().await;

    cancel.cancel();
    drop(gateway);
    let _ = event_loop.await;
    let _ = server.await;

    info!("Shut down cleanly");
    result
}
