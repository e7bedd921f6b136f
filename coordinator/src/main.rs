use std::{env, io};

use comms::specs::{self, coordinator::CoordinatorSpec};
use coordinator::{ControlServer, Coordinator, CoordinatorConfig, CoordinatorHandle};
use log::{info, warn};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5567".to_string());
    let addr = format!("{host}:{port}");

    let spec: CoordinatorSpec = specs::from_env_or_default("CONFIG")?;
    let coordinator = Coordinator::new(CoordinatorConfig::try_from(spec)?);
    let config = coordinator.config();
    info!(
        max_minibatches = config.max_minibatches(),
        patience = config.patience(),
        validation_interval = config.validation_interval();
        "starting coordinator"
    );

    let handle = CoordinatorHandle::new(coordinator);
    let mut server = ControlServer::new(handle.clone());

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    tokio::select! {
        res = server.serve(listener) => {
            if let Err(e) = res {
                warn!("server stopped: {e}");
            }
        }
        _ = signal::ctrl_c() => {}
    }

    let status = handle.status();
    info!("final status: {status:?}");

    Ok(())
}
