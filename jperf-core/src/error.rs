use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required column: {0}")]
    Schema(&'static str),
    #[error("malformed telemetry input: {0}")]
    MalformedInput(String),
    #[cfg(feature = "fast-csv")]
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),
}
