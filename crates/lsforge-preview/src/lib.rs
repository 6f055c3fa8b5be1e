#![warn(clippy::pedantic)]

pub mod cache;
pub mod engine;
pub mod handlers;
pub mod manager;
pub mod record;
pub mod util;

pub use cache::PreviewCache;
pub use engine::PreviewEngine;
pub use handlers::{Handler, HandlerCapabilities, HandlerRegistry};
pub use manager::PreviewManager;
pub use record::{PreviewRecord, Thumbnail, ThumbnailDecoder};
