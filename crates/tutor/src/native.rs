use crate::create_app;
use crate::settings::{AppSettings, SETTINGS_FILE};
use std::path::Path;
use tracing::info;

/// Entry point used by the native executable.
pub fn run() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;
    let settings = AppSettings::load_or_default(Path::new(SETTINGS_FILE));
    info!(
        provider = ?settings.llm.provider,
        model = %settings.llm.model,
        "starting tutor"
    );

    let handle = runtime.handle().clone();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Concept Map Tutor",
        native_options,
        Box::new(move |cc| Ok(Box::new(create_app(cc, settings, handle)))),
    )
}
