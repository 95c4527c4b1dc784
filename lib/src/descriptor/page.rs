use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A navigation link: where it points and what it says.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub path: String,
    pub text: String,
}

impl Link {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Link { path: path.into(), text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.text.is_empty()
    }
}

/// Inheritable, per-node page metadata.
///
/// `path`, `parent` and the navigation links are computed by the tree and are
/// never read from a descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageData {
    pub author: String,
    pub title: String,
    pub description: String,
    pub copyright: String,
    #[serde(with = "date")]
    pub date: Option<NaiveDate>,
    #[serde(with = "date")]
    pub updated: Option<NaiveDate>,
    #[serde(skip_deserializing)]
    pub path: String,
    #[serde(skip_deserializing)]
    pub parent: String,
    #[serde(skip_deserializing)]
    pub next: Link,
    #[serde(skip_deserializing)]
    pub prev: Link,
    #[serde(skip_deserializing)]
    pub up: Link,
}

trait Unset {
    fn is_unset(&self) -> bool;
}

impl Unset for String {
    fn is_unset(&self) -> bool { self.is_empty() }
}

impl<T> Unset for Option<T> {
    fn is_unset(&self) -> bool { self.is_none() }
}

impl Unset for Link {
    fn is_unset(&self) -> bool { self.is_empty() }
}

fn fill<T: Unset + Clone>(field: &mut T, from: &T) {
    if field.is_unset() {
        *field = from.clone();
    }
}

impl PageData {
    /// Fills every field of `self` that is unset with the corresponding field
    /// of `parent`. Fields that are already set are never touched.
    pub fn inherit(&mut self, parent: &PageData) {
        fill(&mut self.author, &parent.author);
        fill(&mut self.title, &parent.title);
        fill(&mut self.description, &parent.description);
        fill(&mut self.copyright, &parent.copyright);
        fill(&mut self.date, &parent.date);
        fill(&mut self.updated, &parent.updated);
        fill(&mut self.path, &parent.path);
        fill(&mut self.parent, &parent.parent);
        fill(&mut self.next, &parent.next);
        fill(&mut self.prev, &parent.prev);
        fill(&mut self.up, &parent.up);
    }
}

/// Parses a descriptor date: `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(string: &str) -> Result<NaiveDate, chrono::ParseError> {
    let string = string.trim();
    NaiveDate::parse_from_str(string, "%Y-%m-%d")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(string).map(|dt| dt.date_naive()))
}

/// Serde adapter for optional dates written as strings.
pub(crate) mod date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let string = Option::<String>::deserialize(d)?;
        string.filter(|s| !s.trim().is_empty())
            .map(|s| super::parse_date(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
