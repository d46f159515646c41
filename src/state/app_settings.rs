use log::LevelFilter;
use std::str::FromStr;

#[derive(Debug, Default, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
}

impl AppSettings {
    pub fn load() -> Self {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|raw| LevelFilter::from_str(raw.trim()).ok());
        Self { full_screen: false, log_level }
    }
}
