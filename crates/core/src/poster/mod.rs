//! Upload-and-thread orchestration.

pub mod planner;
pub mod ports;
pub mod service;

pub use planner::build_post_plan;
pub use ports::{ImageCompressor, PassThroughCompressor, PostingApi};
pub use service::{PostOptions, PostProgressFn, PosterService, UploadProgressFn};
