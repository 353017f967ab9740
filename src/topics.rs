//! Topic set loading.
//!
//! A topic set is an XML document holding a sequence of `<topic>` elements:
//!
//! ```xml
//! <topics>
//!   <topic number="1">
//!     <query>coronavirus origin</query>
//!     <question>what is the origin of COVID-19</question>
//!     <narrative>seeking range of information about the SARS-CoV-2 virus's origin</narrative>
//!   </topic>
//! </topics>
//! ```
//!
//! Only two children matter per topic: the primary field (`models`, `query`
//! or `question`, chosen by configuration) and `narrative`. Both must be
//! present with text content; anything else is ignored.

use crate::error::{EmbedError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Element name of the narrative field.
pub const NARRATIVE_TAG: &str = "narrative";

/// Which child element supplies the primary text of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryField {
    /// `<models>`, the model-description schema
    Models,
    /// `<query>`, the keyword query schema
    Query,
    /// `<question>`, the natural language question
    Question,
}

impl PrimaryField {
    /// XML tag name of this field.
    pub fn tag(self) -> &'static str {
        match self {
            PrimaryField::Models => "models",
            PrimaryField::Query => "query",
            PrimaryField::Question => "question",
        }
    }
}

impl fmt::Display for PrimaryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PrimaryField {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "models" => Ok(PrimaryField::Models),
            "query" => Ok(PrimaryField::Query),
            "question" => Ok(PrimaryField::Question),
            other => Err(EmbedError::Config(format!(
                "unknown primary field {:?} (expected models, query or question)",
                other
            ))),
        }
    }
}

/// One `<topic>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// Raw `number` attribute, if any. Logged only, never used as a key.
    pub number: Option<String>,
    /// Text of the primary field
    pub primary: String,
    /// Text of the narrative field
    pub narrative: String,
}

/// The text pair handed to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPair {
    pub primary: String,
    pub narrative: String,
}

impl TopicPair {
    pub fn new(primary: impl Into<String>, narrative: impl Into<String>) -> Self {
        TopicPair {
            primary: primary.into(),
            narrative: narrative.into(),
        }
    }
}

impl Topic {
    pub fn pair(&self) -> TopicPair {
        TopicPair::new(self.primary.clone(), self.narrative.clone())
    }
}

/// Parse every `<topic>` of `xml` in document order.
///
/// # Errors
///
/// - [`EmbedError::Xml`] if the document is malformed
/// - [`EmbedError::MissingField`] if a topic lacks the primary or narrative text
pub fn parse_topics(xml: &str, field: PrimaryField) -> Result<Vec<Topic>> {
    let doc = roxmltree::Document::parse(xml)?;

    doc.descendants()
        .filter(|node| node.has_tag_name("topic"))
        .enumerate()
        .map(|(position, node)| -> Result<Topic> {
            let topic = Topic {
                number: node.attribute("number").map(str::to_string),
                primary: child_text(node, field.tag(), position)?,
                narrative: child_text(node, NARRATIVE_TAG, position)?,
            };
            debug!(position, number = ?topic.number, "parsed topic");
            Ok(topic)
        })
        .collect()
}

/// Read `path` and parse its topics.
pub fn load_topics(path: impl AsRef<Path>, field: PrimaryField) -> Result<Vec<Topic>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
    parse_topics(&content, field)
}

// First text node of the first `tag` element below `node`, verbatim.
fn child_text(node: roxmltree::Node<'_, '_>, tag: &str, position: usize) -> Result<String> {
    node.descendants()
        .skip(1)
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::to_string)
        .ok_or_else(|| EmbedError::MissingField {
            position,
            tag: tag.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPICS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<topics task="COVIDSearch">
  <topic number="1">
    <query>coronavirus origin</query>
    <models>SARS-CoV-2 origin models</models>
    <question>what is the origin of COVID-19</question>
    <narrative>seeking range of information about the virus origin</narrative>
  </topic>
  <topic number="2">
    <query>coronavirus response to weather changes</query>
    <models>weather models</models>
    <question>how does the coronavirus respond to changes in the weather</question>
    <narrative>seeking range of information about viral persistence</narrative>
  </topic>
</topics>"#;

    #[test]
    fn test_parses_topics_in_document_order() {
        let topics = parse_topics(TOPICS, PrimaryField::Query).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].number.as_deref(), Some("1"));
        assert_eq!(topics[0].primary, "coronavirus origin");
        assert_eq!(
            topics[1].narrative,
            "seeking range of information about viral persistence"
        );
    }

    #[test]
    fn test_primary_field_selects_element() {
        let models = parse_topics(TOPICS, PrimaryField::Models).unwrap();
        assert_eq!(models[0].primary, "SARS-CoV-2 origin models");

        let questions = parse_topics(TOPICS, PrimaryField::Question).unwrap();
        assert_eq!(
            questions[1].primary,
            "how does the coronavirus respond to changes in the weather"
        );
    }

    #[test]
    fn test_missing_primary_field_is_fatal() {
        let xml = "<topics><topic><query>q</query><narrative>n</narrative></topic></topics>";
        match parse_topics(xml, PrimaryField::Models) {
            Err(EmbedError::MissingField { position, tag }) => {
                assert_eq!(position, 0);
                assert_eq!(tag, "models");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_narrative_is_fatal() {
        let xml = "<topics>\
                   <topic><query>a</query><narrative>b</narrative></topic>\
                   <topic><query>c</query></topic>\
                   </topics>";
        let err = parse_topics(xml, PrimaryField::Query).unwrap_err();
        assert!(matches!(err, EmbedError::MissingField { position: 1, .. }));
    }

    #[test]
    fn test_empty_element_counts_as_missing() {
        let xml = "<topics><topic><query/><narrative>n</narrative></topic></topics>";
        let err = parse_topics(xml, PrimaryField::Query).unwrap_err();
        assert!(matches!(err, EmbedError::MissingField { .. }));
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let xml = "<topics><topic><query>  padded &amp; escaped </query>\
                   <narrative>n</narrative></topic></topics>";
        let topics = parse_topics(xml, PrimaryField::Query).unwrap();
        assert_eq!(topics[0].primary, "  padded & escaped ");
        assert_eq!(topics[0].number, None);
    }

    #[test]
    fn test_non_numeric_topic_number_is_kept() {
        let xml = r#"<topics><topic number="1a"><models>A</models><narrative>B</narrative></topic></topics>"#;
        let topics = parse_topics(xml, PrimaryField::Models).unwrap();
        assert_eq!(topics[0].number.as_deref(), Some("1a"));
        assert_eq!(topics[0].pair(), TopicPair::new("A", "B"));
    }

    #[test]
    fn test_wrapped_fields_are_found() {
        let xml = "<topics><topic>\
                   <fields><models>wrapped</models></fields>\
                   <body><narrative>deep</narrative></body>\
                   </topic></topics>";
        let topics = parse_topics(xml, PrimaryField::Models).unwrap();
        assert_eq!(topics[0].pair(), TopicPair::new("wrapped", "deep"));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_topics("<topics><topic>", PrimaryField::Query).unwrap_err();
        assert!(matches!(err, EmbedError::Xml(_)));
    }

    #[test]
    fn test_no_topics() {
        assert!(parse_topics("<topics/>", PrimaryField::Query).unwrap().is_empty());
    }

    #[test]
    fn test_primary_field_from_str() {
        assert_eq!("models".parse::<PrimaryField>().unwrap(), PrimaryField::Models);
        assert_eq!("query".parse::<PrimaryField>().unwrap(), PrimaryField::Query);
        assert!("title".parse::<PrimaryField>().is_err());
    }

    #[test]
    fn test_load_topics_missing_file() {
        let err = load_topics("does/not/exist.xml", PrimaryField::Query).unwrap_err();
        assert!(matches!(err, EmbedError::Io { .. }));
    }
}
