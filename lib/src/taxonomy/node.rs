use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use derive_more::Debug;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::descriptor::{Descriptor, Head, HeadData, Kind, Link, PageData};
use crate::fingerprint::Fingerprint;
use crate::taxonomy::*;
use crate::util::ComputeOnce;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node's descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Read from this descriptor file in the node's directory.
    Descriptor(Arc<Path>),
    /// Synthesized for a directory with a conventional name.
    Directory,
    /// Synthesized for a dated content file.
    File,
    /// Built in memory.
    Synthetic,
}

/// A file a node was built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dependency {
    Descriptor,
    Markdown,
    Resource,
}

/// One page of the content tree.
///
/// The structural fields are fixed at insertion. Everything derived from the
/// descriptor lives behind a lock and is filled in by [`Node::resolve()`].
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: Kind,
    /// The node's name among its siblings. Empty for the root.
    pub name: Arc<str>,
    /// `/` for the root, `/parent/name` below it.
    pub path: Arc<str>,
    /// The file or directory the node was discovered at.
    pub source: Arc<Path>,
    pub origin: Origin,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub(crate) clock: NaiveDate,
    pub(crate) children: RwLock<Children>,
    pub(crate) state: RwLock<State>,
    pub(crate) fingerprint: ComputeOnce<Fingerprint>,
    /// Items of this node's children, by tag.
    #[debug(ignore)]
    pub(crate) index: RwLock<TagIndex>,
}

#[derive(Debug, Default)]
pub(crate) struct Children {
    pub order: Vec<NodeId>,
    pub names: FxHashMap<Arc<str>, NodeId>,
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub descriptor: Descriptor,
    pub resolved: bool,
    pub page: PageData,
    pub head: HeadData,
    /// Effective resources, dependency-closed, in inclusion order.
    pub resources: Vec<Arc<str>>,
    /// Effective exclusions, handed down to children.
    pub excludes: Vec<Arc<str>>,
    pub tags: Vec<Arc<str>>,
    pub images: Vec<Arc<Image>>,
    pub deps: FxHashMap<Arc<Path>, Dependency>,
    /// Tag registrations this node made, withdrawn by `invalidate`.
    pub registrations: Vec<Registration>,
}

/// One entry this node added to a tag index.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub tag: Arc<str>,
    pub id: Fingerprint,
    /// In the parent's index rather than the tree's.
    pub local: bool,
    /// The image registered, or `None` for the node itself.
    pub image: Option<Arc<Image>>,
}

impl State {
    pub fn new(descriptor: Descriptor) -> State {
        State {
            descriptor,
            resolved: false,
            page: PageData::default(),
            head: HeadData::default(),
            resources: vec![],
            excludes: vec![],
            tags: vec![],
            images: vec![],
            deps: FxHashMap::default(),
            registrations: vec![],
        }
    }
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: NodeId,
        name: Arc<str>,
        path: Arc<str>,
        parent: Option<&Node>,
        descriptor: Descriptor,
        source: Arc<Path>,
        origin: Origin,
        clock: NaiveDate,
    ) -> Node {
        Node {
            id,
            kind: descriptor.kind(),
            name,
            path,
            source,
            origin,
            parent: parent.map(|p| p.id),
            depth: parent.map_or(0, |p| p.depth + 1),
            clock,
            children: RwLock::new(Children::default()),
            state: RwLock::new(State::new(descriptor)),
            fingerprint: ComputeOnce::new(),
            index: RwLock::new(TagIndex::new()),
        }
    }

    /// The directory relative references in the descriptor resolve against.
    pub fn dir(&self) -> &Path {
        match self.origin {
            Origin::File => self.source.parent().unwrap_or(&self.source),
            _ => &self.source,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.read().resolved
    }

    /// The node's children in insertion order.
    pub fn children(&self) -> Vec<NodeId> {
        self.children.read().order.clone()
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.read().names.get(name).copied()
    }

    pub fn has_children(&self) -> bool {
        !self.children.read().order.is_empty()
    }

    /// The raw descriptor, as declared or synthesized.
    pub fn descriptor(&self) -> Descriptor {
        self.state.read().descriptor.clone()
    }

    /// The resolved page data. Empty until resolved.
    pub fn page(&self) -> PageData {
        self.state.read().page.clone()
    }

    pub fn head_data(&self) -> HeadData {
        self.state.read().head.clone()
    }

    /// The effective resources, in inclusion order.
    pub fn resources(&self) -> Vec<Arc<str>> {
        self.state.read().resources.clone()
    }

    pub fn excludes(&self) -> Vec<Arc<str>> {
        self.state.read().excludes.clone()
    }

    /// The node's own tags. Only posts have any.
    pub fn tags(&self) -> Vec<Arc<str>> {
        self.state.read().tags.clone()
    }

    /// The images of a gallery, in declaration order.
    pub fn images(&self) -> Vec<Arc<Image>> {
        self.state.read().images.clone()
    }

    /// The files the node was built from, by path.
    pub fn dependencies(&self) -> Vec<(Arc<Path>, Dependency)> {
        let mut deps: Vec<_> = self.state.read().deps.iter()
            .map(|(path, dep)| (path.clone(), *dep))
            .collect();

        deps.sort();
        deps
    }

    pub fn depends_on(&self, path: &Path) -> bool {
        self.state.read().deps.contains_key(path)
    }

    pub fn links(&self) -> (Link, Link, Link) {
        let state = self.state.read();
        (state.page.up.clone(), state.page.prev.clone(), state.page.next.clone())
    }

    /// The presentation head: effective resources materialized against the
    /// tree's registry.
    pub fn head(&self, tree: &Tree) -> Head {
        let (title, meta, resources) = {
            let state = self.state.read();
            (state.page.title.clone(), state.head.meta.clone(), state.resources.clone())
        };

        let registry = tree.registry.read();
        Head::materialize(&title, &meta, &resources, &registry)
    }

    /// Posts among this node's children tagged `tag`.
    pub fn tagged(&self, tag: &str) -> Vec<Arc<dyn Listable>> {
        self.index.read().get(tag)
    }

    pub fn tag_cloud(&self) -> Vec<(Arc<str>, usize)> {
        self.index.read().cloud()
    }

    /// The node's identifier, computed on first request from its resolved
    /// page data.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint.get_or_init(|| {
            let state = self.state.read();
            Fingerprint::new(state.page.date, state.page.updated, &state.page.title, self.clock)
        })
    }
}

impl Listable for Node {
    fn date(&self) -> Option<NaiveDate> {
        self.state.read().page.date
    }

    fn identifier(&self) -> Fingerprint {
        self.fingerprint()
    }

    fn title(&self) -> String {
        self.state.read().page.title.clone()
    }

    fn feed_entry(&self) -> FeedEntry {
        let id = self.fingerprint();
        let state = self.state.read();
        FeedEntry {
            id,
            title: state.page.title.clone(),
            link: self.path.to_string(),
            date: state.page.date,
            author: state.page.author.clone(),
            description: state.page.description.clone(),
        }
    }
}
