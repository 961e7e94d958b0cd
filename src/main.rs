mod app;
mod backend;
mod config;
mod data;
mod error;
mod model;
mod notification;
mod router;
mod screens;
mod session;
mod sync;

use std::error::Error;
use std::sync::Arc;

use iced::Theme;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::App;
use backend::SharedBackend;
use backend::SupabaseClient;

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::load_config()?;
    let settings = config::backend_from_env(&config).inspect_err(|e| error!("{}", e))?;
    info!("Using backend at {}", settings.url);
    let backend: SharedBackend = Arc::new(SupabaseClient::new(&settings)?);
    let theme = config::theme_from_str(&config.theme_name).unwrap_or(Theme::Dark);

    iced::application("Portal Escolar", App::update, App::view)
        .theme(|app: &App| app.theme.clone())
        .subscription(App::subscription)
        .window_size(iced::Size::new(1400.0, 800.0))
        .run_with(move || App::new(backend, theme))?;
    Ok(())
}
