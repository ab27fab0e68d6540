//! Editing helpers applied to images before planning.

pub mod alt_text;

pub use alt_text::update_alt_texts;
