//! Turns an ordered image list into a thread plan.

use panelpost_domain::constants::CHUNK_SIZE;
use panelpost_domain::{chunk, ComicImage, PlanOptions, PostPlan, PostPlanEntry, Result};

/// Build the thread plan for `images`.
///
/// Images marked for removal are dropped before chunking. Each post holds
/// up to four images; the first post carries the free-text body.
pub fn build_post_plan(images: &[ComicImage], options: &PlanOptions) -> Result<PostPlan> {
    let usable: Vec<ComicImage> =
        images.iter().filter(|image| !image.marked_for_removal).cloned().collect();
    let groups = chunk(&usable, CHUNK_SIZE)?;
    let total_posts = groups.len();

    let entries = groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| {
            let from = group.first().map_or(0, |image| image.index);
            let to = group.last().map_or(0, |image| image.index);
            let templated = derive_post_text(options, index, total_posts, from, to);
            let text = if index == 0 { first_post_text(options, templated) } else { templated };
            PostPlanEntry { id: (index + 1).to_string(), text, images: group }
        })
        .collect();

    Ok(PostPlan::new(entries))
}

fn first_post_text(options: &PlanOptions, templated: String) -> String {
    let base = options.first_post_text.as_str();
    if !options.enable_template || templated.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        templated
    } else {
        format!("{}\n{templated}", base.trim_end())
    }
}

fn derive_post_text(
    options: &PlanOptions,
    index: usize,
    total_posts: usize,
    from: usize,
    to: usize,
) -> String {
    match options.template.as_deref() {
        Some(template) if options.enable_template && !template.is_empty() => template
            .replace("{i}", &(index + 1).to_string())
            .replace("{n}", &total_posts.to_string())
            .replace("{from}", &(from + 1).to_string())
            .replace("{to}", &(to + 1).to_string()),
        _ => options.fallback_text.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(count: usize) -> Vec<ComicImage> {
        (0..count)
            .map(|i| ComicImage::new(format!("img-{i}"), format!("page{i}.png"), i, "image/png", vec![0u8; 4]))
            .collect()
    }

    fn templated(template: &str, first: &str) -> PlanOptions {
        PlanOptions {
            first_post_text: first.into(),
            template: Some(template.into()),
            enable_template: true,
            fallback_text: None,
        }
    }

    #[test]
    fn nine_images_make_three_posts() {
        let plan = build_post_plan(&pages(9), &PlanOptions::default()).unwrap();
        let sizes: Vec<_> = plan.entries().iter().map(|e| e.images.len()).collect();
        assert_eq!(sizes, [4, 4, 1]);
        assert_eq!(plan.total_images(), 9);
        let ids: Vec<_> = plan.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn removed_images_are_excluded() {
        let mut images = pages(5);
        images[1].marked_for_removal = true;
        images[3].marked_for_removal = true;

        let plan = build_post_plan(&images, &PlanOptions::default()).unwrap();
        assert_eq!(plan.total_posts(), 1);
        assert_eq!(plan.total_images(), 3);
        assert!(plan.images().all(|image| !image.marked_for_removal));
    }

    #[test]
    fn template_numbers_every_post() {
        let plan = build_post_plan(&pages(12), &templated("({i}/{n})", "")).unwrap();
        let texts: Vec<_> = plan.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["(1/3)", "(2/3)", "(3/3)"]);
    }

    #[test]
    fn first_post_prefixes_body_and_trims_trailing_space() {
        let plan = build_post_plan(&pages(5), &templated("p{from}-{to}", "My comic  \n")).unwrap();
        assert_eq!(plan.entries()[0].text, "My comic\np1-4");
        assert_eq!(plan.entries()[1].text, "p5-5");
    }

    #[test]
    fn disabled_template_uses_fallback_after_first_post() {
        let options = PlanOptions {
            first_post_text: "Hello".into(),
            template: Some("({i}/{n})".into()),
            enable_template: false,
            fallback_text: Some("cont.".into()),
        };
        let plan = build_post_plan(&pages(6), &options).unwrap();
        assert_eq!(plan.entries()[0].text, "Hello");
        assert_eq!(plan.entries()[1].text, "cont.");
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let plan = build_post_plan(&[], &PlanOptions::default()).unwrap();
        assert!(plan.is_empty());
    }
}
