use std::path::Path;

use panelpost_domain::{sort_by_sequence, ComicImage, DisplayRegistry, Result};
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::domain;

const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];
const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// A file handed to intake: its name, declared type (possibly empty) and
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl IntakeFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), data }
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

/// MIME type implied by a file name's extension.
#[must_use]
pub fn infer_mime_type(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Keep files that are PNG, JPEG or WebP by declared type or by extension.
#[must_use]
pub fn filter_image_files(files: Vec<IntakeFile>) -> Vec<IntakeFile> {
    files
        .into_iter()
        .filter(|file| {
            let mime = file.mime_type.to_ascii_lowercase();
            ACCEPTED_MIME_TYPES.contains(&mime.as_str())
                || extension_of(&file.name)
                    .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect()
}

/// Order files by page sequence and wrap them as pages with fresh ids,
/// sequential indices, `Page {n}` alt texts and a display reference each.
pub fn to_comic_images(mut files: Vec<IntakeFile>, registry: &DisplayRegistry) -> Vec<ComicImage> {
    sort_by_sequence(&mut files, |file| file.name.as_str());
    files
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let mime_type = if file.mime_type.is_empty() {
                infer_mime_type(&file.name).to_string()
            } else {
                file.mime_type
            };
            ComicImage::new(Uuid::new_v4().to_string(), file.name, index, mime_type, file.data)
                .with_alt_text(format!("Page {}", index + 1))
                .with_display(registry)
        })
        .collect()
}

/// Release every display reference (page and thumbnail) held by `images`.
pub fn release_comic_images(images: &mut [ComicImage]) {
    for image in images {
        image.release_display();
    }
}

/// Read the regular files directly inside `dir`, with types inferred from
/// their names. Subdirectories are skipped.
#[instrument]
pub async fn read_image_dir(dir: &Path) -> Result<Vec<IntakeFile>> {
    let mut entries = fs::read_dir(dir).await.map_err(domain)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(domain)? {
        if !entry.file_type().await.map_err(domain)?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let data = fs::read(entry.path()).await.map_err(domain)?;
        let mime_type = match infer_mime_type(&name) {
            "application/octet-stream" => String::new(),
            known => known.to_string(),
        };
        files.push(IntakeFile { name, mime_type, data });
    }
    debug!(count = files.len(), "read directory");
    Ok(filter_image_files(files))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn file(name: &str, mime: &str) -> IntakeFile {
        IntakeFile::new(name, mime, vec![0u8; 4])
    }

    #[test]
    fn infers_types_from_extension() {
        assert_eq!(infer_mime_type("a.PNG"), "image/png");
        assert_eq!(infer_mime_type("b.jpeg"), "image/jpeg");
        assert_eq!(infer_mime_type("c.jpg"), "image/jpeg");
        assert_eq!(infer_mime_type("d.webp"), "image/webp");
        assert_eq!(infer_mime_type("notes.txt"), "application/octet-stream");
    }

    #[test]
    fn filter_accepts_type_or_extension() {
        let kept = filter_image_files(vec![
            file("cover.png", ""),
            file("scan", "image/jpeg"),
            file("readme.md", "text/markdown"),
            file("anim.gif", "image/gif"),
            file("page.WEBP", ""),
        ]);
        let names: Vec<_> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["cover.png", "scan", "page.WEBP"]);
    }

    #[test]
    fn pages_are_ordered_numbered_and_labelled() {
        let registry = DisplayRegistry::new();
        let images = to_comic_images(
            vec![file("page10.png", "image/png"), file("page2.jpg", ""), file("page1.png", "image/png")],
            &registry,
        );

        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["page1.png", "page2.jpg", "page10.png"]);
        assert_eq!(images[1].mime_type, "image/jpeg");
        assert_eq!(images[2].index, 2);
        assert_eq!(images[2].alt_text, "Page 3");
        assert_ne!(images[0].id, images[1].id);
        assert_eq!(registry.live(), 3);
    }

    #[test]
    fn release_drops_display_references() {
        let registry = DisplayRegistry::new();
        let mut images = to_comic_images(vec![file("1.png", "image/png")], &registry);
        release_comic_images(&mut images);
        assert_eq!(registry.live(), 0);
    }

    #[tokio::test]
    async fn reads_only_image_files_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("01.png"), [1u8]).unwrap();
        std::fs::write(dir.path().join("02.jpg"), [2u8]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("extra.png")).unwrap();

        let mut files = read_image_dir(dir.path()).await.unwrap();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].mime_type, "image/jpeg");
        assert_eq!(files[0].data, vec![1u8]);
    }
}
