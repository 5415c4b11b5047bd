pub mod accessions;
pub mod app;
pub mod config;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod ncbi;
pub mod output;
pub mod store;
