pub mod app;
pub mod browser;
pub mod collector;
pub mod diary;
pub mod display;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod report;
pub mod screenshot;
pub mod settings;
pub mod state;
pub mod store;
pub mod tasks;
pub mod walker;

pub use app::router;
pub use collector::{collect_latest_reports, DayCollector, Scraper};
pub use settings::{Settings, SettingsSource};
pub use state::AppState;
pub use store::{resolve_settings_path, JsonFileStore};
