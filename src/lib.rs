pub mod config;
pub mod error;
pub mod pose;
pub mod posture;
#[cfg(feature = "desktop")]
pub mod session;
pub mod video;

pub use error::{PipelineError, Result};
pub use posture::PostureType;
#[cfg(feature = "desktop")]
pub use session::{AnalysisReport, FrameFeedback, SessionAggregator};
