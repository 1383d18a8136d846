//! Format selection and file I/O for way documents.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tagmod_eval::Record;
use tempfile::NamedTempFile;

use crate::error::DocumentError;
use crate::json::JsonDocument;
use crate::xml::XmlDocument;

/// On-disk document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// OSM XML (`.osm`, `.xml`)
    Xml,
    /// Overpass JSON (`.json`)
    Json,
}

impl Format {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Format, DocumentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("xml") | Some("osm") => Ok(Format::Xml),
            Some("json") => Ok(Format::Json),
            _ => Err(DocumentError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xml => write!(f, "xml"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// A way collection in either format. Only way tags are editable; the rest
/// of the document is written back as read.
#[derive(Debug, Clone)]
pub enum WayDocument {
    Xml(XmlDocument),
    Json(JsonDocument),
}

impl WayDocument {
    pub fn parse(text: &str, format: Format) -> Result<Self, DocumentError> {
        Ok(match format {
            Format::Xml => WayDocument::Xml(XmlDocument::from_xml_str(text)?),
            Format::Json => WayDocument::Json(JsonDocument::from_json_str(text)?),
        })
    }

    /// Read a document, choosing the format from the file extension.
    pub fn read(path: &Path) -> Result<Self, DocumentError> {
        let format = Format::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(DocumentError::io(path))?;
        let doc = Self::parse(&text, format)?;
        tracing::debug!(
            path = %path.display(),
            %format,
            ways = doc.records().len(),
            "document loaded"
        );
        Ok(doc)
    }

    pub fn format(&self) -> Format {
        match self {
            WayDocument::Xml(_) => Format::Xml,
            WayDocument::Json(_) => Format::Json,
        }
    }

    /// Ways in document order.
    pub fn records(&self) -> &[Record] {
        match self {
            WayDocument::Xml(doc) => doc.records(),
            WayDocument::Json(doc) => doc.records(),
        }
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        match self {
            WayDocument::Xml(doc) => doc.records_mut(),
            WayDocument::Json(doc) => doc.records_mut(),
        }
    }

    /// The document text in its own format.
    pub fn to_text(&self) -> Result<String, DocumentError> {
        match self {
            WayDocument::Xml(doc) => doc.to_xml_string(),
            WayDocument::Json(doc) => {
                let mut text = doc.to_json_string_pretty()?;
                text.push('\n');
                Ok(text)
            }
        }
    }

    /// Write to `path` through a temporary file in the same directory, so
    /// the destination is either the old file or the complete new one.
    ///
    /// The document keeps its own format whatever the extension says.
    pub fn write_atomic(&self, path: &Path) -> Result<(), DocumentError> {
        if let Ok(target) = Format::from_path(path) {
            if target != self.format() {
                tracing::warn!(
                    path = %path.display(),
                    document = %self.format(),
                    extension = %target,
                    "output extension does not match document format"
                );
            }
        }
        write_atomic(path, self.to_text()?.as_bytes())?;
        tracing::info!(path = %path.display(), ways = self.records().len(), "document written");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(DocumentError::io(dir))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(DocumentError::io(tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| DocumentError::io(path)(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_XML: &str = "<osm>\n  <way id=\"3\">\n    <tag k=\"highway\" v=\"service\"/>\n  </way>\n</osm>\n";
    const SMALL_JSON: &str = r#"{"elements": [{"type": "way", "id": 3, "tags": {"highway": "service"}}]}"#;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.osm")).unwrap(), Format::Xml);
        assert_eq!(Format::from_path(Path::new("city.XML")).unwrap(), Format::Xml);
        assert_eq!(Format::from_path(Path::new("city.json")).unwrap(), Format::Json);
        assert!(matches!(
            Format::from_path(Path::new("city.csv")),
            Err(DocumentError::UnknownFormat { .. })
        ));
        assert!(Format::from_path(Path::new("city")).is_err());
    }

    #[test]
    fn both_formats_expose_the_same_records() {
        let xml = WayDocument::parse(SMALL_XML, Format::Xml).unwrap();
        let json = WayDocument::parse(SMALL_JSON, Format::Json).unwrap();
        assert_eq!(xml.format(), Format::Xml);
        assert_eq!(json.format(), Format::Json);
        assert_eq!(xml.records(), json.records());
    }

    #[test]
    fn write_atomic_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.osm");
        std::fs::write(&path, "old").unwrap();

        let mut doc = WayDocument::parse(SMALL_XML, Format::Xml).unwrap();
        doc.records_mut()[0].tags.push("surface", "asphalt");
        doc.write_atomic(&path).unwrap();

        let reread = WayDocument::read(&path).unwrap();
        assert_eq!(reread.records()[0].tags.get("surface"), Some("asphalt"));
        // Only the destination remains; the temporary file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn json_output_ends_with_newline() {
        let doc = WayDocument::parse(SMALL_JSON, Format::Json).unwrap();
        assert!(doc.to_text().unwrap().ends_with("}\n"));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = WayDocument::read(Path::new("/nonexistent/dir/doc.xml")).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
        assert!(err.to_string().contains("doc.xml"));
    }

    #[test]
    fn read_unknown_extension_is_rejected() {
        let err = WayDocument::read(Path::new("ways.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownFormat { .. }));
    }
}
