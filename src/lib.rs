pub mod chart;
pub mod config;
pub mod db;
pub mod debounce;
pub mod explorer;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod view;
