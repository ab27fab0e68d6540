//! Bulk alt-text templating.

use panelpost_domain::ComicImage;

/// Rewrite the alt text of every non-removed image from `template`.
///
/// `{i}` is the 1-based position among kept images, `{n}` their count and
/// `{name}` the file name without its extension. Removed images keep
/// their current alt text.
pub fn update_alt_texts(images: &mut [ComicImage], template: &str) {
    let total = images.iter().filter(|image| !image.marked_for_removal).count();
    for (position, image) in images.iter_mut().filter(|image| !image.marked_for_removal).enumerate() {
        let alt_text = template
            .replace("{i}", &(position + 1).to_string())
            .replace("{n}", &total.to_string())
            .replace("{name}", image.stem());
        image.alt_text = alt_text;
    }
}
