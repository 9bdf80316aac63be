pub mod accuracy;
pub mod confidence;
pub mod features;
pub mod metrics;
pub mod service;

pub use accuracy::*;
pub use confidence::*;
pub use features::*;
pub use metrics::*;
pub use service::*;
