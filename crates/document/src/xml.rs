//! OSM XML way collections.
//!
//! The document is kept as a stream of `quick-xml` events. Each `<way>`
//! becomes a [`Record`] built from its `<tag k v>` children; those tag
//! elements are replaced on output by the record's current tags, and every
//! other event (nodes, relations, `<nd>` refs, comments, whitespace) is
//! written back as it was read. Repeated `k` attributes are kept as
//! separate tags.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tagmod_eval::{Record, TagSet};

use crate::error::DocumentError;

const WAY: &[u8] = b"way";
const TAG: &[u8] = b"tag";

#[derive(Debug, Clone)]
struct OriginalTag {
    key: String,
    value: String,
    /// Whitespace that preceded the element
    indent: String,
    start: BytesStart<'static>,
    /// Written as `<tag ...></tag>` rather than `<tag .../>`
    paired: bool,
}

#[derive(Debug, Clone)]
enum Segment {
    Event(Event<'static>),
    /// Where a way's tag elements go
    Tags {
        record: usize,
        originals: Vec<OriginalTag>,
        /// Indent for tags added beyond the originals
        indent: String,
    },
    /// `<way .../>`, expanded only if it gains tags
    EmptyWay {
        record: usize,
        start: BytesStart<'static>,
    },
}

/// A parsed OSM XML document whose ways can be edited as [`Record`]s.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    segments: Vec<Segment>,
    records: Vec<Record>,
}

impl XmlDocument {
    pub fn from_xml_str(s: &str) -> Result<Self, DocumentError> {
        Parser::new(s).run()
    }

    /// Ways in document order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Serialize the document with the current record tags.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for segment in &self.segments {
            match segment {
                Segment::Event(event) => write(&mut writer, event.borrow())?,
                Segment::Tags {
                    record,
                    originals,
                    indent,
                } => self.write_tags(&mut writer, *record, originals, indent)?,
                Segment::EmptyWay { record, start } => {
                    if self.records[*record].tags.is_empty() {
                        write(&mut writer, Event::Empty(start.borrow()))?;
                    } else {
                        write(&mut writer, Event::Start(start.borrow()))?;
                        self.write_tags(&mut writer, *record, &[], "")?;
                        write(&mut writer, Event::End(start.to_end()))?;
                    }
                }
            }
        }
        String::from_utf8(writer.into_inner()).map_err(DocumentError::xml)
    }

    /// Unchanged tags keep their original markup; anything else is written
    /// as a fresh `<tag k="..." v="..."/>`.
    fn write_tags(
        &self,
        writer: &mut Writer<Vec<u8>>,
        record: usize,
        originals: &[OriginalTag],
        indent: &str,
    ) -> Result<(), DocumentError> {
        for (i, tag) in self.records[record].tags.iter().enumerate() {
            match originals.get(i) {
                Some(orig) if orig.key == tag.key && orig.value == tag.value => {
                    write_indent(writer, &orig.indent)?;
                    if orig.paired {
                        write(writer, Event::Start(orig.start.borrow()))?;
                        write(writer, Event::End(orig.start.to_end()))?;
                    } else {
                        write(writer, Event::Empty(orig.start.borrow()))?;
                    }
                }
                orig => {
                    write_indent(writer, orig.map_or(indent, |o| o.indent.as_str()))?;
                    let element = BytesStart::new("tag")
                        .with_attributes([("k", tag.key.as_str()), ("v", tag.value.as_str())]);
                    write(writer, Event::Empty(element))?;
                }
            }
        }
        Ok(())
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocumentError> {
    writer.write_event(event).map_err(DocumentError::xml)
}

fn write_indent(writer: &mut Writer<Vec<u8>>, indent: &str) -> Result<(), DocumentError> {
    if indent.is_empty() {
        return Ok(());
    }
    write(writer, Event::Text(BytesText::from_escaped(indent)))
}

// ──────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────

#[derive(Debug)]
struct OpenWay {
    record: usize,
    /// Index of this way's `Segment::Tags`, once one exists
    tags_at: Option<usize>,
    /// Whitespace before the first non-tag child
    child_indent: Option<String>,
    /// Nesting below the `<way>` element
    depth: usize,
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    segments: Vec<Segment>,
    records: Vec<Record>,
    open: Option<OpenWay>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            reader: Reader::from_str(input),
            segments: Vec::new(),
            records: Vec::new(),
            open: None,
        }
    }

    fn run(mut self) -> Result<XmlDocument, DocumentError> {
        loop {
            let event = self.reader.read_event().map_err(DocumentError::xml)?;
            if matches!(event, Event::Eof) {
                break;
            }
            let event = event.into_owned();
            match self.open.take() {
                Some(way) => self.in_way(way, event)?,
                None => self.outside_way(event)?,
            }
        }
        if let Some(way) = &self.open {
            return Err(DocumentError::Xml(format!(
                "way {} is not closed",
                self.records[way.record].id
            )));
        }
        Ok(XmlDocument {
            segments: self.segments,
            records: self.records,
        })
    }

    fn outside_way(&mut self, event: Event<'static>) -> Result<(), DocumentError> {
        match event {
            Event::Start(start) if start.name().as_ref() == WAY => {
                let record = self.new_record(&start)?;
                self.open = Some(OpenWay {
                    record,
                    tags_at: None,
                    child_indent: None,
                    depth: 0,
                });
                self.push(Event::Start(start));
            }
            Event::Empty(start) if start.name().as_ref() == WAY => {
                let record = self.new_record(&start)?;
                self.segments.push(Segment::EmptyWay { record, start });
            }
            other => self.push(other),
        }
        Ok(())
    }

    fn in_way(&mut self, mut way: OpenWay, event: Event<'static>) -> Result<(), DocumentError> {
        match event {
            Event::Empty(start) if way.depth == 0 && start.name().as_ref() == TAG => {
                self.tag(&mut way, start, false)?;
            }
            Event::Start(start) if way.depth == 0 && start.name().as_ref() == TAG => {
                self.reader
                    .read_to_end(start.name())
                    .map_err(DocumentError::xml)?;
                self.tag(&mut way, start, true)?;
            }
            Event::Start(start) => {
                self.note_child(&mut way);
                way.depth += 1;
                self.push(Event::Start(start));
            }
            Event::Empty(start) => {
                self.note_child(&mut way);
                self.push(Event::Empty(start));
            }
            Event::End(end) if way.depth == 0 => {
                if way.tags_at.is_none() {
                    // Tags added later go before the closing whitespace.
                    let closing = self.take_blank_text();
                    let indent = way
                        .child_indent
                        .clone()
                        .or_else(|| closing.clone())
                        .unwrap_or_default();
                    self.segments.push(Segment::Tags {
                        record: way.record,
                        originals: Vec::new(),
                        indent,
                    });
                    if let Some(text) = closing {
                        self.push(Event::Text(BytesText::from_escaped(text)));
                    }
                }
                self.push(Event::End(end));
                return Ok(());
            }
            Event::End(end) => {
                way.depth -= 1;
                self.push(Event::End(end));
            }
            other => self.push(other),
        }
        self.open = Some(way);
        Ok(())
    }

    fn tag(
        &mut self,
        way: &mut OpenWay,
        start: BytesStart<'static>,
        paired: bool,
    ) -> Result<(), DocumentError> {
        let id = self.records[way.record].id;
        let (Some(key), Some(value)) = (attribute(&start, "k")?, attribute(&start, "v")?) else {
            return Err(DocumentError::MalformedTag { way: id });
        };
        let indent = self.take_blank_text().unwrap_or_default();

        let at = match way.tags_at {
            Some(at) => at,
            None => {
                self.segments.push(Segment::Tags {
                    record: way.record,
                    originals: Vec::new(),
                    indent: String::new(),
                });
                let at = self.segments.len() - 1;
                way.tags_at = Some(at);
                at
            }
        };

        self.records[way.record].tags.push(key.as_str(), value.as_str());
        if let Some(Segment::Tags {
            originals,
            indent: next_indent,
            ..
        }) = self.segments.get_mut(at)
        {
            next_indent.clone_from(&indent);
            originals.push(OriginalTag {
                key,
                value,
                indent,
                start,
                paired,
            });
        }
        Ok(())
    }

    fn note_child(&self, way: &mut OpenWay) {
        if way.depth == 0 && way.child_indent.is_none() {
            way.child_indent = self.segments.last().and_then(blank_text);
        }
    }

    fn new_record(&mut self, start: &BytesStart<'_>) -> Result<usize, DocumentError> {
        let index = self.records.len();
        let id = attribute(start, "id")?
            .and_then(|id| id.trim().parse::<i64>().ok())
            .ok_or(DocumentError::MissingWayId { index })?;
        self.records.push(Record::new(id, TagSet::new()));
        Ok(index)
    }

    fn push(&mut self, event: Event<'static>) {
        self.segments.push(Segment::Event(event));
    }

    /// Pop the last segment if it is whitespace-only text.
    fn take_blank_text(&mut self) -> Option<String> {
        let text = self.segments.last().and_then(blank_text)?;
        self.segments.pop();
        Some(text)
    }
}

fn blank_text(segment: &Segment) -> Option<String> {
    match segment {
        Segment::Event(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {
            Some(String::from_utf8_lossy(t).into_owned())
        }
        _ => None,
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, DocumentError> {
    match start.try_get_attribute(name).map_err(DocumentError::xml)? {
        Some(attr) => Ok(Some(
            attr.unescape_value()
                .map_err(DocumentError::xml)?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <note>The data included in this document is from www.openstreetmap.org.</note>
  <node id="1" lat="47.07" lon="15.43">
    <tag k="highway" v="traffic_signals"/>
  </node>
  <node id="2" lat="47.08" lon="15.44"/>
  <way id="100">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="primary"/>
    <tag k="lanes" v="3"/>
    <tag k="ref" v="A"/>
    <tag k="ref" v="B"/>
  </way>
  <way id="101">
    <nd ref="2"/>
  </way>
  <way id="102"/>
  <relation id="7">
    <member type="way" ref="100" role=""/>
    <tag k="type" v="route"/>
  </relation>
</osm>
"#;

    fn city() -> XmlDocument {
        XmlDocument::from_xml_str(CITY).unwrap()
    }

    #[test]
    fn ways_become_records() {
        let doc = city();
        let ids: Vec<i64> = doc.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
        assert_eq!(doc.records()[0].tags.len(), 4);
        assert_eq!(doc.records()[0].tags.get("lanes"), Some("3"));
        assert!(doc.records()[1].tags.is_empty());
        assert!(doc.records()[2].tags.is_empty());
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let doc = city();
        assert_eq!(doc.records()[0].tags.count("ref"), 2);
        assert_eq!(doc.records()[0].tags.get("ref"), Some("A"));
    }

    #[test]
    fn untouched_document_round_trips() {
        assert_eq!(city().to_xml_string().unwrap(), CITY);
    }

    #[test]
    fn edits_replace_tag_elements() {
        let mut doc = city();
        let way = &mut doc.records_mut()[0];
        way.tags.set_first("lanes", "2");
        way.tags.remove_all("highway");
        way.tags.push("maxspeed", "30");

        let out = doc.to_xml_string().unwrap();
        assert!(out.contains(
            "    <nd ref=\"2\"/>\n    <tag k=\"lanes\" v=\"2\"/>\n    <tag k=\"ref\" v=\"A\"/>\n    \
             <tag k=\"ref\" v=\"B\"/>\n    <tag k=\"maxspeed\" v=\"30\"/>\n  </way>"
        ));
        assert!(!out.contains("v=\"primary\""));
        // Node and relation tags are not way tags.
        assert!(out.contains("<tag k=\"highway\" v=\"traffic_signals\"/>"));
        assert!(out.contains("<tag k=\"type\" v=\"route\"/>"));
    }

    #[test]
    fn untagged_way_gains_indented_tags() {
        let mut doc = city();
        doc.records_mut()[1].tags.push("surface", "paved");
        let out = doc.to_xml_string().unwrap();
        assert!(out.contains(
            "<way id=\"101\">\n    <nd ref=\"2\"/>\n    <tag k=\"surface\" v=\"paved\"/>\n  </way>"
        ));
    }

    #[test]
    fn self_closing_way_is_expanded_only_when_tagged() {
        let mut doc = city();
        doc.records_mut()[0].tags.push("checked", "yes");
        assert!(doc.to_xml_string().unwrap().contains("<way id=\"102\"/>"));

        doc.records_mut()[2].tags.push("surface", "paved");
        assert!(doc
            .to_xml_string()
            .unwrap()
            .contains("<way id=\"102\"><tag k=\"surface\" v=\"paved\"/></way>"));
    }

    #[test]
    fn written_values_are_escaped() {
        let mut doc = city();
        doc.records_mut()[1].tags.push("name", "Tom & \"Jerry\" <Str>");
        let out = doc.to_xml_string().unwrap();

        let reread = XmlDocument::from_xml_str(&out).unwrap();
        assert_eq!(reread.records()[1].tags.get("name"), Some("Tom & \"Jerry\" <Str>"));
    }

    #[test]
    fn paired_tag_elements_are_read() {
        let text = "<osm><way id=\"5\"><tag k=\"a\" v=\"1\"></tag></way></osm>";
        let doc = XmlDocument::from_xml_str(text).unwrap();
        assert_eq!(doc.records()[0].tags.get("a"), Some("1"));
        assert_eq!(doc.to_xml_string().unwrap(), text);
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            XmlDocument::from_xml_str("<osm><way><tag k=\"a\" v=\"b\"/></way></osm>"),
            Err(DocumentError::MissingWayId { index: 0 })
        ));
        assert!(matches!(
            XmlDocument::from_xml_str("<osm><way id=\"x\"/></osm>"),
            Err(DocumentError::MissingWayId { index: 0 })
        ));
        assert!(matches!(
            XmlDocument::from_xml_str("<osm><way id=\"9\"><tag k=\"a\"/></way></osm>"),
            Err(DocumentError::MalformedTag { way: 9 })
        ));
        assert!(matches!(
            XmlDocument::from_xml_str("<osm><way id=\"9\"></osm>"),
            Err(DocumentError::Xml(_))
        ));
    }
}
