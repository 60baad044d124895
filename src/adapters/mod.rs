pub mod alpha_vantage_adapter;
pub mod csv_store_adapter;
pub mod file_config_adapter;
pub mod json_artifact_adapter;

#[cfg(feature = "web")]
pub mod web;
