use env_logger::Env;
use log::{error, info};
use plate_console::config::Config;
use plate_console::session::Session;
use plate_console::web;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-console");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using backend at {}", config.backend_url);
    let session = match Session::new(&config) {
        Ok(session) => session,
        Err(e) => {
            error!("Unable to create backend client: {}", e);
            std::process::exit(1);
        }
    };

    let server_task = tokio::spawn(web::run(session.clone(), config.listen_addr));
    tokio::select! {
        result = server_task => match result {
            Ok(Err(e)) => error!("Operator console failed: {}", e),
            Err(e) => error!("Operator console task failed: {}", e),
            Ok(Ok(())) => {}
        },
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
    session.live.deactivate().await;
    info!("Exiting main");
}
