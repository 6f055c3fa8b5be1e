#![warn(clippy::pedantic)]

pub mod attribute;
pub mod document;
pub mod node;
pub mod region;
pub mod stats;

pub use attribute::Attribute;
pub use document::Document;
pub use node::Node;
pub use region::Region;
pub use stats::{Complexity, DocumentStats};
