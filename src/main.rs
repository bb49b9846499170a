use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod pipeline;
mod samples;
mod server;
mod signnow;

use signnow::SignApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    // A broken catalog fails startup, never a request
    let catalog = samples::Catalog::load(cfg.samples.catalog_file.as_deref())?;
    let registry = samples::SampleRegistry::from_catalog(catalog);
    let api: Arc<dyn SignApi> = Arc::new(signnow::HttpSignApi::new(&cfg.signnow)?);
    let state = Arc::new(config::AppState::new(&cfg, api, registry));

    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg, &state.samples.names());

    let shutdown = Arc::new(server::Shutdown::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run_server_loop(listener, state, shutdown))
        .await;
    Ok(())
}
