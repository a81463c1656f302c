use crate::config::Config;

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
#[cfg(feature = "desktop")]
mod ipc;
pub mod state;
pub mod sync;
pub mod terminal;
pub mod utils;

pub use error::ChatError;
pub use state::ChatContext;
pub use sync::SessionView;

fn init_logging(config: &Config) {
    // stderr keeps log lines out of the chat transcript on stdout
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the configuration, then hand control to the front-end.
pub fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config);
    tracing::info!("Starting chat client for {}", config.backend_url);
    launch(config)
}

#[cfg(not(feature = "desktop"))]
fn launch(config: Config) -> anyhow::Result<()> {
    use anyhow::Context as _;
    use std::sync::Arc;

    let context = Arc::new(ChatContext::new(config)?);
    tokio::runtime::Runtime::new()
        .context("failed to start the async runtime")?
        .block_on(terminal::run(context))
}

#[cfg(feature = "desktop")]
fn launch(config: Config) -> anyhow::Result<()> {
    use tauri::Manager as _;

    let context = ChatContext::new(config)?;
    let app = tauri::Builder::default()
        .manage(context)
        .setup(|app| {
            ipc::spawn_event_forwarder(app.handle());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            ipc::connect,
            ipc::disconnect,
            ipc::send_message,
            ipc::set_username,
            ipc::set_room,
            ipc::set_draft,
            ipc::refresh,
            ipc::get_session,
            ipc::get_backend_url,
        ])
        .build(tauri::generate_context!())?;

    app.run(|handle, event| {
        if let tauri::RunEvent::Exit = event {
            let context = handle.state::<ChatContext>();
            tauri::async_runtime::block_on(context.disconnect());
        }
    });
    Ok(())
}
