//! Raw, unresolved per-directory declarations.
//!
//! A descriptor is read from a TOML file in a content directory, or
//! synthesized by discovery for "magic" nodes that follow a naming
//! convention. Descriptors are inputs only: resolution never mutates them.

mod page;
mod head;
mod resource;

pub use page::*;
pub use head::*;
pub use resource::*;

pub(crate) use page::date;

use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Kind as ErrorKind, Result};

/// The kind of a descriptor, and so of the node it becomes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Root,
    Post,
    Listing,
    Gallery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    Root(Root),
    Post(Post),
    Listing(Listing),
    Gallery(Gallery),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Root {
    pub page: PageData,
    pub head: HeadData,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub page: PageData,
    pub head: HeadData,
    pub tags: Vec<String>,
    /// The markdown source, relative to the post's directory. Discovery fills
    /// in the configured default when absent.
    pub content: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub page: PageData,
    pub head: HeadData,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gallery {
    pub page: PageData,
    pub head: HeadData,
    pub images: Vec<ImageDescriptor>,
}

/// One image embedded in a gallery.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDescriptor {
    pub file: String,
    pub title: String,
    pub description: String,
    #[serde(with = "page::date")]
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl Descriptor {
    /// Reads and decodes the descriptor file at `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Descriptor> {
        let path = path.as_ref();
        let string = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::from(e).with_kind(ErrorKind::Unreadable))
            .chain_with(|| error! {
                "failed to read descriptor",
                "path" => path.display(),
            })?;

        Descriptor::parse(&string)
            .chain_with(|| error! {
                "invalid descriptor",
                "path" => path.display(),
            })
    }

    /// Decodes a descriptor from TOML source.
    pub fn parse(string: &str) -> Result<Descriptor> {
        toml::from_str(string)
            .map_err(|e| crate::error::Error::from(e).with_kind(ErrorKind::Malformed))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Descriptor::Root(_) => Kind::Root,
            Descriptor::Post(_) => Kind::Post,
            Descriptor::Listing(_) => Kind::Listing,
            Descriptor::Gallery(_) => Kind::Gallery,
        }
    }

    pub fn page(&self) -> &PageData {
        match self {
            Descriptor::Root(d) => &d.page,
            Descriptor::Post(d) => &d.page,
            Descriptor::Listing(d) => &d.page,
            Descriptor::Gallery(d) => &d.page,
        }
    }

    pub fn page_mut(&mut self) -> &mut PageData {
        match self {
            Descriptor::Root(d) => &mut d.page,
            Descriptor::Post(d) => &mut d.page,
            Descriptor::Listing(d) => &mut d.page,
            Descriptor::Gallery(d) => &mut d.page,
        }
    }

    pub fn head(&self) -> &HeadData {
        match self {
            Descriptor::Root(d) => &d.head,
            Descriptor::Post(d) => &d.head,
            Descriptor::Listing(d) => &d.head,
            Descriptor::Gallery(d) => &d.head,
        }
    }

    pub fn head_mut(&mut self) -> &mut HeadData {
        match self {
            Descriptor::Root(d) => &mut d.head,
            Descriptor::Post(d) => &mut d.head,
            Descriptor::Listing(d) => &mut d.head,
            Descriptor::Gallery(d) => &mut d.head,
        }
    }

    /// Declared tags. Only posts declare tags of their own.
    pub fn tags(&self) -> &[String] {
        match self {
            Descriptor::Post(post) => &post.tags,
            _ => &[],
        }
    }
}

impl From<Root> for Descriptor {
    fn from(value: Root) -> Self { Descriptor::Root(value) }
}

impl From<Post> for Descriptor {
    fn from(value: Post) -> Self { Descriptor::Post(value) }
}

impl From<Listing> for Descriptor {
    fn from(value: Listing) -> Self { Descriptor::Listing(value) }
}

impl From<Gallery> for Descriptor {
    fn from(value: Gallery) -> Self { Descriptor::Gallery(value) }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Root => "root".fmt(f),
            Kind::Post => "post".fmt(f),
            Kind::Listing => "listing".fmt(f),
            Kind::Gallery => "gallery".fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_descriptor() {
        let descriptor = Descriptor::parse(r#"
            kind = "post"
            tags = ["rust", "notes"]

            [page]
            title = "Hello"
            date = "2024-01-05"

            [head]
            include = ["base"]
            exclude = ["analytics"]
            meta = [{ name = "robots", content = "noindex" }]

            [[head.resources]]
            name = "base"
            type = "style"
            method = "url"
            value = "https://example.com/base.css"
            depends = ["fonts"]
        "#).unwrap();

        assert_eq!(descriptor.kind(), Kind::Post);
        assert_eq!(descriptor.tags().to_vec(), vec!["rust".to_string(), "notes".to_string()]);
        assert_eq!(descriptor.page().title, "Hello");
        assert_eq!(descriptor.head().include, vec!["base".to_string()]);
        assert_eq!(descriptor.head().meta[0].name, "robots");
        assert_eq!(&*descriptor.head().local_names()[0], "base");
        let Descriptor::Post(post) = descriptor else { unreachable!() };
        assert_eq!(post.content, None);
    }

    #[test]
    fn gallery_descriptor() {
        let descriptor = Descriptor::parse(r#"
            kind = "gallery"

            [[images]]
            file = "dawn.jpg"
            tags = ["sky"]

            [[images]]
            file = "dusk.jpg"
            title = "Dusk"
            date = "2023-07-01"
        "#).unwrap();

        let Descriptor::Gallery(gallery) = descriptor else { panic!("not a gallery") };
        assert_eq!(gallery.images.len(), 2);
        assert_eq!(gallery.images[0].tags, vec!["sky".to_string()]);
        assert_eq!(gallery.images[1].date, NaiveDate::from_ymd_opt(2023, 7, 1));
    }

    #[test]
    fn malformed_descriptors_are_typed() {
        let error = Descriptor::parse("kind = \"shrine\"").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);

        let error = Descriptor::parse("kind = \"post\"\n[page]\ndate = \"soon\"").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn missing_files_are_unreadable() {
        let error = Descriptor::read("/definitely/not/here/index.toml").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unreadable);
        assert!(error.to_string().contains("failed to read descriptor"));
    }
}
