//! tagmod-document: OSM way collections as editable records.
//!
//! Reads an OSM XML file (`<osm>` with `<way>`/`<tag>` elements) or an
//! Overpass-style JSON document (`{"elements": [...]}`), exposes each way
//! as a [`tagmod_eval::Record`] and writes the edited document back
//! without disturbing anything but way tags.

pub mod document;
pub mod error;
pub mod json;
pub mod xml;

pub use document::{Format, WayDocument};
pub use error::DocumentError;
pub use json::JsonDocument;
pub use xml::XmlDocument;
