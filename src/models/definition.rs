// src/models/definition.rs

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One jotform record as returned by `GET /api/jotforms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDefinition {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub jotform_name: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number as authored in the builder (usually 1-based).
    pub page: i64,

    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub tag_name: TagName,

    /// Raw content. HTML for paragraphs, the bound for `randominteger`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub content: String,

    #[serde(default)]
    pub sequence: i64,
}

/// Element kind. Unknown builder tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagName {
    Paragraph,
    Heading,
    RandomInteger,
    VideoRecording,
    Other(String),
}

impl TagName {
    pub fn as_str(&self) -> &str {
        match self {
            TagName::Paragraph => "paragraph",
            TagName::Heading => "heading",
            TagName::RandomInteger => "randominteger",
            TagName::VideoRecording => "videorecording",
            TagName::Other(tag) => tag,
        }
    }
}

impl From<&str> for TagName {
    fn from(tag: &str) -> Self {
        match tag {
            "paragraph" => TagName::Paragraph,
            "heading" => TagName::Heading,
            "randominteger" => TagName::RandomInteger,
            "videorecording" => TagName::VideoRecording,
            other => TagName::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TagName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TagName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TagName::from(raw.as_str()))
    }
}

impl AssignmentDefinition {
    /// Elements of every page in page order, without reordering within pages.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.pages.iter().flat_map(|page| page.elements.iter())
    }
}

/// The backend is loose about ids and contents: accept strings, numbers and null.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Null,
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => s,
        Some(Loose::Int(n)) => n.to_string(),
        Some(Loose::Float(n)) => n.to_string(),
        Some(Loose::Bool(b)) => b.to_string(),
        Some(Loose::Null) | None => String::new(),
    })
}
