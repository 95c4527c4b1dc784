#![doc = svgbobdoc::transform!(
//! A configuration resolution engine for directory-shaped sites.
//!
//! # Overview
//!
//! Canopy turns a directory of independently authored, partially specified
//! descriptors into a single resolved content tree: page metadata inherited
//! from ancestors, a closed set of page resources, a cross-referencing tag
//! index, sibling navigation links, and stable content-derived identifiers.
//! It does not render anything; renderers consume the resolved tree through
//! the [`Renderer`] trait.
//!
//! Internally, canopy organizes content as follows:
//!
//! ```svgbob
//!                    +------------------------------+
//!                    |             Tree             |
//!                    |  +----------+  +----------+  |
//!                    |  | Registry |  | TagIndex |  |
//!                    |  +----------+  +----------+  |
//!                    +--------------+---------------+
//!                                   |
//!                              +----+----+
//!                              |  Root   |
//!                              +----+----+
//!                                   |
//!            +----------------------+----------------------+
//!            |                      |                      |
//!       +----+----+            +----+----+            +----+----+
//!       | Listing |            | Gallery |            |  Post   |
//!       +----+----+            +----+----+            +---------+
//!            |                      |
//!   +--------+--------+        +----+----+
//!   |        |        |        |  image  |...
//! +-+--+  +--+-+   +--+-+      +---------+
//! |Post|<-|Post|<->|Post|
//! +----+  +----+   +----+
//! ```
//!
//! In words, a **tree** consists of:
//!
//!   * **Nodes**, one per content directory or dated content file, each
//!     wrapping a raw [`Descriptor`](descriptor::Descriptor) of one of four
//!     kinds: root, post, listing, or gallery.
//!
//!   * A **resource registry**: every named style or script any descriptor
//!     defines. The first definition of a name wins.
//!
//!   * A **tag index**: every post and gallery image, by tag.
//!
//! ## Resolution
//!
//! A tree is typically built via the following set of operations:
//!
//! 1. The content root is walked depth first, in file name order. Every
//!    directory with a descriptor becomes a node of the declared kind; dated
//!    files (`2024-01-05-hello.md`) and conventionally named directories
//!    (`blog/`) become posts and listings without one.
//! 2. Each node is resolved as soon as it's created:
//!    - Unset page data is filled in from the parent.
//!    - Resources are included, excluded, and closed over their
//!      dependencies.
//!    - Tags are registered and an identifier is computed.
//! 3. Once all children of a directory exist, they're linked to each other
//!    by publish date.
//! 4. The resolved tree is handed to a [`Renderer`].
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fingerprint;
pub mod descriptor;
pub mod settings;
pub mod fstree;
pub mod taxonomy;
pub mod discover;

pub use taxonomy::*;
pub use discover::{discover, discover_with};

pub use rayon;
pub use tracing;
