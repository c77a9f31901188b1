//! Outbound credential flows: acquisition, cached access, and background refresh.

pub mod acquire;
pub mod background;
pub mod lifecycle;
pub mod policy;

mod metrics;

pub use acquire::*;
pub use background::*;
pub use lifecycle::*;
pub use metrics::RefreshMetrics;
pub use policy::*;
