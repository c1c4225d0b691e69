use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, info, warn};

use crate::constants::{
    ALIASES_TAG, COUNTRY_TAG, DATE_OF_BIRTH_TAG, ENTITY_TAG, GIVEN_NAME_TAG, ITEM_TAG,
    LAST_NAME_TAG, RECORD_TAG, SCHEDULE_TAG,
};
use crate::error::{Result, ScraperError};
use crate::types::SemaRecord;

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<SemaRecord>>;
}

/// Streams the SEMA XML document and collects every `record` element.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemaXmlParser;

impl SemaXmlParser {
    pub fn new() -> Self {
        Self
    }
}

/// Field text collected for the record currently being read
#[derive(Default)]
struct RecordBuilder {
    fields: HashMap<String, String>,
    /// One slot per open element below the record; `Some(tag)` when that
    /// element is the first occurrence of `tag` and so owns the field text.
    owners: Vec<Option<String>>,
    /// Owners that already had a child element; only their leading text counts.
    sealed: HashSet<String>,
}

impl RecordBuilder {
    fn seal_parent(&mut self) {
        if let Some(Some(parent)) = self.owners.last() {
            self.sealed.insert(parent.clone());
        }
    }

    fn open(&mut self, tag: String) {
        self.seal_parent();
        let owner = if self.fields.contains_key(&tag) {
            None
        } else {
            self.fields.insert(tag.clone(), String::new());
            Some(tag)
        };
        self.owners.push(owner);
    }

    fn empty(&mut self, tag: String) {
        self.seal_parent();
        self.fields.entry(tag).or_default();
    }

    fn close(&mut self) {
        self.owners.pop();
    }

    fn text(&mut self, text: &str) {
        if let Some(Some(tag)) = self.owners.last() {
            if self.sealed.contains(tag) {
                return;
            }
            if let Some(value) = self.fields.get_mut(tag) {
                value.push_str(text);
            }
        }
    }

    fn build(mut self) -> SemaRecord {
        SemaRecord {
            item: self.fields.remove(ITEM_TAG),
            entity: self.fields.remove(ENTITY_TAG),
            given_name: self.fields.remove(GIVEN_NAME_TAG),
            last_name: self.fields.remove(LAST_NAME_TAG),
            date_of_birth: self.fields.remove(DATE_OF_BIRTH_TAG),
            country: self.fields.remove(COUNTRY_TAG),
            aliases: self.fields.remove(ALIASES_TAG),
            schedule: self.fields.remove(SCHEDULE_TAG),
        }
    }
}

impl Parser for SemaXmlParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<SemaRecord>> {
        debug!("SemaXmlParser: start bytes_len={}", bytes.len());
        // Text is decoded with the encoding named in the XML declaration
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();

        let mut records = Vec::new();
        let mut open_elements: Vec<String> = Vec::new();
        let mut saw_root = false;
        // Depth of the open `record` element and the fields gathered so far
        let mut current: Option<(usize, RecordBuilder)> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    if saw_root && open_elements.is_empty() {
                        return Err(ScraperError::Parse("element after the root element".into()));
                    }
                    saw_root = true;
                    let tag = reader.decoder().decode(e.local_name().as_ref())?.into_owned();
                    match current.as_mut() {
                        Some((_, builder)) => builder.open(tag.clone()),
                        None if tag == RECORD_TAG => {
                            current = Some((open_elements.len(), RecordBuilder::default()));
                        }
                        None => {}
                    }
                    open_elements.push(tag);
                }
                Event::Empty(e) => {
                    if saw_root && open_elements.is_empty() {
                        return Err(ScraperError::Parse("element after the root element".into()));
                    }
                    saw_root = true;
                    let tag = reader.decoder().decode(e.local_name().as_ref())?.into_owned();
                    match current.as_mut() {
                        Some((_, builder)) => builder.empty(tag),
                        None if tag == RECORD_TAG => records.push(SemaRecord::default()),
                        None => {}
                    }
                }
                Event::End(_) => {
                    open_elements.pop();
                    let record_closed = matches!(
                        current.as_ref(),
                        Some((depth, _)) if *depth == open_elements.len()
                    );
                    if record_closed {
                        if let Some((_, builder)) = current.take() {
                            records.push(builder.build());
                        }
                    } else if let Some((_, builder)) = current.as_mut() {
                        builder.close();
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if open_elements.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(ScraperError::Parse("text outside the root element".into()));
                        }
                    } else if let Some((_, builder)) = current.as_mut() {
                        builder.text(&text);
                    }
                }
                Event::CData(c) => {
                    if open_elements.is_empty() {
                        return Err(ScraperError::Parse("CDATA outside the root element".into()));
                    }
                    if let Some((_, builder)) = current.as_mut() {
                        let raw = c.into_inner();
                        let text = reader.decoder().decode(&raw)?;
                        builder.text(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(ScraperError::Parse("document has no root element".into()));
        }
        if let Some(tag) = open_elements.last() {
            return Err(ScraperError::Parse(format!(
                "unexpected end of document inside <{}>",
                tag
            )));
        }

        if records.is_empty() {
            warn!("SemaXmlParser: no <{}> elements found", RECORD_TAG);
        } else {
            info!("SemaXmlParser: parsed {} records", records.len());
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<Vec<SemaRecord>> {
        SemaXmlParser::new().parse(xml.as_bytes())
    }

    #[test]
    fn test_parse_individual_and_entity() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<data-set>
  <record>
    <Country>Iran / Iran</Country>
    <LastName>Doe</LastName>
    <GivenName>John</GivenName>
    <DateOfBirth>25/12/1960</DateOfBirth>
    <Schedule>1</Schedule>
    <Item>12</Item>
  </record>
  <record>
    <Country>Syria / Syrie</Country>
    <Entity>ACME Corp/ACME Soci&#233;t&#233;</Entity>
    <Aliases>ACME, A.C.M.E.</Aliases>
    <Schedule>N/A</Schedule>
    <Item>3</Item>
  </record>
</data-set>"#;

        let records = parse(xml).unwrap();
        assert_eq!(records.len(), 2);

        let person = &records[0];
        assert_eq!(person.item.as_deref(), Some("12"));
        assert_eq!(person.given_name.as_deref(), Some("John"));
        assert_eq!(person.last_name.as_deref(), Some("Doe"));
        assert_eq!(person.date_of_birth.as_deref(), Some("25/12/1960"));
        assert_eq!(person.entity, None);

        let company = &records[1];
        assert_eq!(company.entity.as_deref(), Some("ACME Corp/ACME Société"));
        assert_eq!(company.aliases.as_deref(), Some("ACME, A.C.M.E."));
        assert_eq!(company.schedule.as_deref(), Some("N/A"));
        assert_eq!(company.given_name, None);
    }

    #[test]
    fn test_empty_elements_are_present_but_blank() {
        let records = parse("<root><record><Entity/><Country></Country><Item>7</Item></record></root>").unwrap();
        assert_eq!(records[0].entity.as_deref(), Some(""));
        assert_eq!(records[0].country.as_deref(), Some(""));
        assert_eq!(records[0].aliases, None);
    }

    #[test]
    fn test_first_descendant_wins() {
        let xml = "<root><record><names><GivenName>First</GivenName></names><GivenName>Second</GivenName></record></root>";
        let records = parse(xml).unwrap();
        assert_eq!(records[0].given_name.as_deref(), Some("First"));
    }

    #[test]
    fn test_records_found_at_any_depth() {
        let xml = "<root><list><record><Item>1</Item></record></list><record><Item>2</Item></record></root>";
        let records = parse(xml).unwrap();
        let items: Vec<_> = records.iter().map(|r| r.item.as_deref()).collect();
        assert_eq!(items, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_cdata_field() {
        let records = parse("<root><record><Aliases><![CDATA[Smith & Co]]></Aliases></record></root>").unwrap();
        assert_eq!(records[0].aliases.as_deref(), Some("Smith & Co"));
    }

    #[test]
    fn test_document_without_records() {
        let records = parse("<root><other/></root>").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_mismatched_tags_are_fatal() {
        let err = parse("<root><record><Item>1</Entity></record></root>").unwrap_err();
        assert!(matches!(err, ScraperError::Xml(_)));
    }

    #[test]
    fn test_truncated_document_is_fatal() {
        let err = parse("<root><record><Item>1</Item>").unwrap_err();
        assert!(matches!(err, ScraperError::Parse(_)));
    }

    #[test]
    fn test_empty_document_is_fatal() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ScraperError::Parse(_)));
    }

    #[test]
    fn test_latin1_declared_document() {
        let mut xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><root><record><Entity>Soci".to_vec();
        xml.extend_from_slice(b"\xE9t\xE9 G\xE9n\xE9rale</Entity><Item>4</Item></record></root>");

        let records = SemaXmlParser::new().parse(&xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity.as_deref(), Some("Société Générale"));
        assert_eq!(records[0].item.as_deref(), Some("4"));
    }

    #[test]
    fn test_blank_item_is_present() {
        let records = parse("<root><record><Country>Canada / Canada</Country><Item></Item></record></root>").unwrap();
        assert_eq!(records[0].item.as_deref(), Some(""));
    }

    #[test]
    fn test_nested_record_is_part_of_outer_record() {
        let xml = "<root><record><Country>Iran / Iran</Country><record><Item>9</Item></record></record></root>";
        let records = parse(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country.as_deref(), Some("Iran / Iran"));
        // the inner element is just another descendant, so its Item is the first one found
        assert_eq!(records[0].item.as_deref(), Some("9"));
    }

    #[test]
    fn test_only_leading_text_of_field_is_kept() {
        let records = parse("<root><record><Entity>A<b/>B</Entity><Aliases>X<i>Y</i>Z</Aliases></record></root>").unwrap();
        assert_eq!(records[0].entity.as_deref(), Some("A"));
        assert_eq!(records[0].aliases.as_deref(), Some("X"));
    }

    #[test]
    fn test_content_after_root_is_fatal() {
        let err = parse("<root><record><Item>1</Item></record></root><root2/>").unwrap_err();
        assert!(matches!(err, ScraperError::Parse(_)));

        let err = parse("<root><record><Item>1</Item></record></root>trailing").unwrap_err();
        assert!(matches!(err, ScraperError::Parse(_)));
    }

    #[test]
    fn test_trailing_whitespace_after_root_is_allowed() {
        let records = parse("<root><record><Item>1</Item></record></root>\n  \n").unwrap();
        assert_eq!(records.len(), 1);
    }
}
