use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Analysis error: {0}")]
    Core(#[from] jperf_core::Error),
    #[error("Session store error: {0}")]
    Store(#[from] jperf_store::Error),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Annotation API error: {0}")]
    Annotation(String),
}
