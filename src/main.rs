use tracing::{debug, error, info, warn};

use chathub::{Config, Hub, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = chathub::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        chathub::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("chathub - single-room WebSocket chat");

    let (hub, hub_task) = Hub::spawn(&config.hub);

    let mut server = match WebServer::new(&config, hub.clone()) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            std::process::exit(1);
        }
    };
    let sessions = server.take_session_drain();
    info!("Server configured on {}", server.addr());

    // The hub stops first so open sockets get the shutdown notice while the
    // listener drains.
    let shutdown = {
        let hub = hub.clone();
        async move {
            shutdown_signal().await;
            stop_hub(&hub).await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        error!("Web server error: {}", e);
        stop_hub(&hub).await;
    }

    if let Err(e) = hub_task.await {
        error!("Hub task failed: {}", e);
    }

    // Outbound pumps need up to one write deadline for the notice and one
    // for the close frame.
    let grace = config.connection_settings().write_wait * 2;
    if let Some(sessions) = sessions {
        if !sessions.wait(grace).await {
            warn!("Some connections did not close within {:?}", grace);
        }
    }
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}

async fn stop_hub(hub: &Hub) {
    if let Err(e) = hub.shutdown().await {
        debug!("Hub already stopped: {}", e);
    }
}
