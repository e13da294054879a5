pub mod actions;
pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod loader;
pub mod local;
pub mod models;
pub mod platforms;
pub mod remote;
pub mod state;
pub mod stats;
pub mod storage;
pub mod supabase;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::{Backend, Config};
pub use local::LocalService;
pub use platforms::MetricsFetchers;
pub use remote::DataService;
pub use state::AppState;
pub use supabase::SupabaseService;
pub use tracker::Tracker;
