// Library surface for the binary and for integration tests.
pub mod answer_policy;
pub mod app;
pub mod app_dirs;
pub mod category;
pub mod clock;
pub mod config;
pub mod deck;
pub mod history;
pub mod logging;
pub mod progression;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;
pub mod ui;
pub mod util;
pub mod word;
pub mod workers;
