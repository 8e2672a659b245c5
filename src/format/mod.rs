//! Conversion of Telegram rich text into stored form: HTML-like markup for
//! the message body and the set of URLs it references.

pub mod links;
pub mod markup;
pub mod utf16;

pub use links::{extract_urls, join_urls};
pub use markup::render;
