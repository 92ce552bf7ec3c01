mod diagnosis;
mod error;
mod loadstats;
mod metrics;
mod runtime;
mod sample;
mod telemetry;

pub use diagnosis::*;
pub use error::*;
pub use loadstats::*;
pub use metrics::*;
pub use runtime::*;
pub use sample::*;
pub use telemetry::*;
