// src/fetch/mod.rs

pub mod download;
pub mod source;

pub use download::fetch_dataset;
pub use source::{DataSource, DEFAULT_DATASET_URL};
