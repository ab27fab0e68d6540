//! Turning files on disk into upload-ready comic pages.
//!
//! - [`intake`]: filtering, ordering and wrapping files as [`ComicImage`]s
//! - [`analysis`]: dimensions, thumbnail and blank-page metrics
//! - [`compression`]: re-encoding pages that exceed the upload budget
//!
//! [`ComicImage`]: panelpost_domain::ComicImage

pub mod analysis;
pub mod compression;
pub mod intake;

pub use analysis::{analyze_image, analyze_pages, ThumbnailOptions};
pub use compression::ImageReencoder;
pub use intake::{
    filter_image_files, infer_mime_type, read_image_dir, release_comic_images, to_comic_images,
    IntakeFile,
};
