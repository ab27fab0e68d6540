//! Domain types and models

pub mod image;
pub mod plan;
pub mod progress;
pub mod record;
pub mod schedule;
pub mod session;

pub use image::{ComicImage, CompressionMode, DisplayRef, DisplayRegistry, ImageAnalysis, Thumbnail};
pub use plan::{PlanOptions, PostPlan, PostPlanEntry, ThreadResult};
pub use progress::{PostProgress, PostStatus, UploadProgress, UploadStatus};
pub use record::{
    AspectRatio, BlobLink, BlobRef, CreateRecordRequest, CreateRecordResponse, ImageEmbed,
    ImagesEmbed, PostRecord, ReplyRef, StrongRef, UploadBlobResponse, UploadedImageRef,
};
pub use schedule::{FailurePolicy, ScheduledGroup, ScheduledImage, SchedulerEntry};
pub use session::{AppPasswordSession, OAuthSession};
