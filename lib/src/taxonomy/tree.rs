use std::fmt;
use std::ops::Index;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use derive_more::Debug;
use parking_lot::RwLock;

use crate::descriptor::{Descriptor, Head, Kind, Registry, Resource, Root};
use crate::error::{Chainable, Kind as ErrorKind, Result};
use crate::settings::Settings;
use crate::taxonomy::*;
use crate::util::relative_path;

/// The resolved content tree.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. The tree
/// owns the resource registry and the global tag index; both are shared by
/// every resolution and guarded by their own lock.
#[derive(Debug)]
pub struct Tree {
    settings: Settings,
    clock: NaiveDate,
    nodes: Vec<Arc<Node>>,
    pub(crate) registry: RwLock<Registry>,
    #[debug(ignore)]
    pub(crate) tags: RwLock<TagIndex>,
}

impl Tree {
    /// A tree with a single, unresolved root node discovered at `source`.
    pub fn new<P: AsRef<Path>>(settings: Settings, root: Root, source: P, origin: Origin) -> Tree {
        let clock = settings.clock();
        let root = Node::new(
            NodeId(0),
            "".into(),
            "/".into(),
            None,
            root.into(),
            source.as_ref().into(),
            origin,
            clock,
        );

        Tree {
            settings,
            clock,
            nodes: vec![Arc::new(root)],
            registry: RwLock::new(Registry::new()),
            tags: RwLock::new(TagIndex::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The date identifiers are computed against.
    pub fn clock(&self) -> NaiveDate {
        self.clock
    }

    #[inline(always)]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &Arc<Node> {
        &self.nodes[id.0]
    }

    /// Every node, in insertion order.
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds an unresolved child named `name` to `parent`.
    ///
    /// Fails if `name` isn't a single path segment, if `parent` already has a
    /// child of that name, or if `descriptor` is a root.
    pub fn insert<P: AsRef<Path>>(
        &mut self,
        parent: NodeId,
        name: &str,
        descriptor: Descriptor,
        source: P,
        origin: Origin,
    ) -> Result<NodeId> {
        let source = source.as_ref();
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(error! {
                "node names must be a single path segment",
                "name" => name,
                "source" => source.display(),
            }.with_kind(ErrorKind::Malformed));
        }

        if descriptor.kind() == Kind::Root {
            return Err(error! {
                "only the tree root may be of kind root",
                "source" => source.display(),
            }.with_kind(ErrorKind::Conflict));
        }

        let Some(parent) = self.get(parent).cloned() else {
            return Err(error!("no such parent node", "id" => parent.0).with_kind(ErrorKind::NotFound));
        };

        if let Some(existing) = parent.child(name) {
            return Err(error! {
                "a sibling with this name already exists",
                "name" => name,
                "existing" => self[existing].source.display(),
                "rejected" => source.display(),
            }.with_kind(ErrorKind::Conflict));
        }

        let id = NodeId(self.nodes.len());
        let path: Arc<str> = match parent.is_root() {
            true => format!("/{name}").into(),
            false => format!("{}/{name}", parent.path).into(),
        };

        let name: Arc<str> = name.into();
        let node = Node::new(id, name.clone(), path, Some(&*parent), descriptor, source.into(), origin, self.clock);
        self.nodes.push(Arc::new(node));

        let mut children = parent.children.write();
        children.order.push(id);
        children.names.insert(name, id);
        Ok(id)
    }

    /// Resolves the node `id`, and its ancestors if needed.
    pub fn resolve(&self, id: NodeId) -> Result<()> {
        self[id].resolve(self)
    }

    /// Resolves every node, then links every set of siblings.
    pub fn resolve_all(&self) -> Result<()> {
        for id in self.iter_depth_first(self.root_id()) {
            self.resolve(id)?;
        }

        for id in self.iter_depth_first(self.root_id()) {
            if self[id].has_children() {
                self.link_children(id)?;
            }
        }

        Ok(())
    }

    /// Finds the node at a `/`-separated `path`. Empty segments are ignored,
    /// so `""`, `"/"` and `"//"` all name the root.
    pub fn search(&self, path: &str) -> Result<NodeId> {
        let mut current = self.root_id();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = match self[current].child(segment) {
                Some(child) => child,
                None => return Err(error! {
                    "no node at path",
                    "path" => path,
                    "missing segment" => segment,
                }.with_kind(ErrorKind::NotFound)),
            };
        }

        Ok(current)
    }

    /// Everything tagged `tag`, in registration order.
    pub fn tagged(&self, tag: &str) -> Vec<Arc<dyn Listable>> {
        self.tags.read().get(tag)
    }

    /// Every tag with the number of items under it, by tag name.
    pub fn tag_cloud(&self) -> Vec<(Arc<str>, usize)> {
        self.tags.read().cloud()
    }

    pub fn resource(&self, name: &str) -> Option<Arc<Resource>> {
        self.registry.read().get(name).cloned()
    }

    /// Names of every registered resource, ascending.
    pub fn resource_names(&self) -> Vec<Arc<str>> {
        self.registry.read().names()
    }

    pub fn head(&self, id: NodeId) -> Head {
        self[id].head(self)
    }

    /// Pre-order traversal of the subtree at `id`, children in insertion
    /// order.
    pub fn iter_depth_first(&self, id: NodeId) -> Dfs<'_> {
        Dfs { tree: self, stack: vec![id] }
    }

    /// The ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self[id].parent, |&id| self[id].parent)
    }

    /// The deepest node whose source contains `path`.
    pub fn locate<P: AsRef<Path>>(&self, path: P) -> Result<NodeId> {
        let path = path.as_ref();
        if relative_path(path, &self.root().source).is_none() {
            return Err(error! {
                "path is outside of the content root",
                "path" => path.display(),
                "root" => self.root().source.display(),
            }.with_kind(ErrorKind::Detached));
        }

        let id = self.nodes.iter()
            .filter(|node| relative_path(path, &node.source).is_some())
            .max_by_key(|node| node.depth)
            .map_or(self.root_id(), |node| node.id);

        Ok(id)
    }

    /// The nodes built from the file at `path`.
    pub fn dependents<P: AsRef<Path>>(&self, path: P) -> Vec<NodeId> {
        let path = path.as_ref();
        self.nodes.iter()
            .filter(|node| node.depends_on(path))
            .map(|node| node.id)
            .collect()
    }

    /// Re-resolves the subtree at `id`, optionally replacing its descriptor
    /// first. The replacement must be of the same kind.
    ///
    /// Tag registrations of the subtree are withdrawn and made again, and
    /// the affected siblings are relinked.
    pub fn refresh(&self, id: NodeId, descriptor: Option<Descriptor>) -> Result<()> {
        let node = &self[id];
        if let Some(descriptor) = descriptor {
            if descriptor.kind() != node.kind {
                return Err(error! {
                    "a descriptor may not change its kind",
                    "path" => node.path,
                    "was" => node.kind,
                    "now" => descriptor.kind(),
                }.with_kind(ErrorKind::Conflict));
            }

            node.state.write().descriptor = descriptor;
        }

        let subtree: Vec<_> = self.iter_depth_first(id).collect();
        for &id in &subtree {
            self[id].invalidate(self);
        }

        for &id in &subtree {
            self.resolve(id)?;
        }

        if let Some(parent) = node.parent {
            self.link_children(parent)?;
        }

        for &id in &subtree {
            if self[id].has_children() {
                self.link_children(id)?;
            }
        }

        tracing::debug!(path = %node.path, nodes = subtree.len(), "refreshed");
        Ok(())
    }

    /// Rereads the descriptor file of `id`, if it has one, and refreshes the
    /// subtree.
    pub fn reload(&self, id: NodeId) -> Result<()> {
        let node = &self[id];
        let descriptor = match &node.origin {
            Origin::Descriptor(file) => {
                let mut descriptor = Descriptor::read(file)
                    .chain_with(|| error!("failed to reload node", "path" => node.path))?;

                if let Descriptor::Post(post) = &mut descriptor {
                    post.content.get_or_insert_with(|| self.settings.content.clone());
                }

                Some(descriptor)
            }
            _ => None,
        };

        self.refresh(id, descriptor)
    }

    /// A drawing of the tree, one node per line.
    pub fn outline(&self) -> Outline<'_> {
        Outline(self)
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

pub struct Dfs<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Dfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree[id].children().into_iter().rev());
        Some(id)
    }
}

pub struct Outline<'a>(&'a Tree);

impl Outline<'_> {
    fn line(&self, f: &mut fmt::Formatter<'_>, siblings: &[bool], id: NodeId) -> fmt::Result {
        for (j, sibling) in siblings.iter().enumerate() {
            match (sibling, j == siblings.len() - 1) {
                (false, false) => write!(f, "    ")?,
                (false, true) => write!(f, "└── ")?,
                (true, false) => write!(f, "│   ")?,
                (true, true) => write!(f, "├── ")?,
            }
        }

        let node = &self.0[id];
        let page = node.page();
        match node.is_root() {
            true => write!(f, "/ [{}]", node.kind)?,
            false => write!(f, "{} [{}]", node.name, node.kind)?,
        }

        if !page.title.is_empty() {
            write!(f, " {}", page.title)?;
        }

        if let Some(date) = page.date {
            write!(f, " ({date})")?;
        }

        writeln!(f)?;

        let children = node.children();
        for (i, &child) in children.iter().enumerate() {
            let mut siblings = siblings.to_vec();
            siblings.push(i < children.len() - 1);
            self.line(f, &siblings, child)?;
        }

        Ok(())
    }
}

impl fmt::Display for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.line(f, &[], self.0.root_id())
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::descriptor::{HeadData, Listing, Method, PageData, Post, Resource, ResourceKind};

    assert_impl_all!(Tree: Send, Sync);
    assert_impl_all!(Node: Send, Sync);

    fn page(title: &str) -> PageData {
        PageData { title: title.into(), ..Default::default() }
    }

    fn tree() -> Tree {
        let root = Root { page: page("Home"), ..Default::default() };
        Tree::new(Settings::default(), root, "/site", Origin::Synthetic)
    }

    fn listing(title: &str) -> Descriptor {
        Listing { page: page(title), ..Default::default() }.into()
    }

    fn post(title: &str, tags: &[&str]) -> Descriptor {
        Post {
            page: page(title),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }.into()
    }

    #[test]
    fn paths_and_search() {
        let mut tree = tree();
        let blog = tree.insert(tree.root_id(), "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();
        let hello = tree.insert(blog, "hello", post("Hello", &[]), "/site/blog/hello", Origin::Synthetic).unwrap();

        assert_eq!(&*tree[blog].path, "/blog");
        assert_eq!(&*tree[hello].path, "/blog/hello");
        assert_eq!(tree[hello].depth, 2);

        assert_eq!(tree.search("/blog/hello").unwrap(), hello);
        assert_eq!(tree.search("blog//hello/").unwrap(), hello);
        assert_eq!(tree.search("/").unwrap(), tree.root_id());
        assert_eq!(tree.search("").unwrap(), tree.root_id());

        let error = tree.search("/blog/missing").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(tree.ancestors(hello).collect::<Vec<_>>(), vec![blog, tree.root_id()]);
    }

    #[test]
    fn insertion_is_validated() {
        let mut tree = tree();
        let root = tree.root_id();
        tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();

        let error = tree.insert(root, "blog", listing("Again"), "/site/blog2", Origin::Synthetic).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);

        let error = tree.insert(root, "a/b", listing("Nested"), "/site/a", Origin::Synthetic).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);

        let error = tree.insert(root, "r", Root::default().into(), "/site/r", Origin::Synthetic).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn posts_register_locally_below_the_root_only() {
        let mut tree = tree();
        let root = tree.root_id();
        let about = tree.insert(root, "about", post("About", &["meta"]), "/site/about", Origin::Synthetic).unwrap();
        let blog = tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();
        let hello = tree.insert(blog, "hello", post("Hello", &["rust", "meta", "rust"]), "/site/blog/hello", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        let titles = |items: Vec<Arc<dyn Listable>>| items.iter().map(|i| i.title()).collect::<Vec<_>>();
        assert_eq!(titles(tree.tagged("meta")), ["About", "Hello"]);
        assert_eq!(titles(tree.tagged("rust")), ["Hello"]);
        assert_eq!(titles(tree[blog].tagged("rust")), ["Hello"]);
        assert!(tree.root().tagged("meta").is_empty());
        assert!(tree.tagged("nothing").is_empty());

        assert_eq!(tree[hello].tags(), vec![Arc::<str>::from("rust"), Arc::<str>::from("meta")]);
        assert_eq!(tree.tag_cloud(), vec![(Arc::<str>::from("meta"), 2), (Arc::<str>::from("rust"), 1)]);

        // Resolving again registers nothing new.
        tree.resolve(about).unwrap();
        tree.refresh(hello, None).unwrap();
        assert_eq!(titles(tree.tagged("meta")), ["About", "Hello"]);
    }

    #[test]
    fn refresh_replaces_descriptor_and_tags() {
        let mut tree = tree();
        let root = tree.root_id();
        let blog = tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();
        let hello = tree.insert(blog, "hello", post("Hello", &["rust"]), "/site/blog/hello", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        let before = tree[hello].fingerprint();
        tree.refresh(hello, Some(post("Goodbye", &["go"]))).unwrap();

        assert_eq!(tree[hello].page().title, "Goodbye");
        assert_ne!(tree[hello].fingerprint(), before);
        assert!(tree.tagged("rust").is_empty());
        assert_eq!(tree[blog].tagged("go").len(), 1);
        assert_eq!(tree[hello].page().up.text, "Blog");

        let error = tree.refresh(hello, Some(listing("Nope"))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn refresh_spares_items_sharing_a_fingerprint() {
        let mut tree = tree();
        let root = tree.root_id();
        let a = tree.insert(root, "a", listing("A"), "/site/a", Origin::Synthetic).unwrap();
        let b = tree.insert(root, "b", listing("B"), "/site/b", Origin::Synthetic).unwrap();
        let first = tree.insert(a, "x", post("Same", &["rust"]), "/site/a/x", Origin::Synthetic).unwrap();
        let second = tree.insert(b, "x", post("Same", &["rust"]), "/site/b/x", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        assert_eq!(tree[first].fingerprint(), tree[second].fingerprint());
        assert_eq!(tree.tagged("rust").len(), 1);

        tree.refresh(second, Some(post("Other", &["go"]))).unwrap();
        let rust = tree.tagged("rust");
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].identifier(), tree[first].fingerprint());
        assert_eq!(tree[a].tagged("rust").len(), 1);
        assert!(tree[b].tagged("rust").is_empty());
        assert_eq!(tree[b].tagged("go").len(), 1);

        tree.refresh(first, Some(post("Same", &[]))).unwrap();
        assert!(tree.tagged("rust").is_empty());
        assert!(tree[a].tagged("rust").is_empty());
    }

    #[test]
    fn refresh_replaces_resource_definitions() {
        let style = |name: &str, value: &str| Resource {
            name: name.into(),
            kind: ResourceKind::Style,
            method: Method::Raw,
            value: value.into(),
            attributes: Default::default(),
            depends_on: vec![],
        };

        let with_head = |resources: Vec<Resource>| -> Descriptor {
            Listing { page: page("L"), head: HeadData { resources, ..Default::default() } }.into()
        };

        let mut tree = tree();
        let root = tree.root_id();
        let l = tree.insert(root, "l", with_head(vec![style("s", "old"), style("t", "t")]), "/site/l", Origin::Synthetic).unwrap();
        let child = tree.insert(l, "c", post("C", &[]), "/site/l/c", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();
        assert_eq!(tree[child].resources(), vec![Arc::<str>::from("s"), Arc::<str>::from("t")]);

        tree.refresh(l, Some(with_head(vec![style("s", "new")]))).unwrap();
        assert_eq!(tree.resource("s").unwrap().value, "new");
        assert!(tree.resource("t").is_none());
        assert_eq!(tree[child].resources(), vec![Arc::<str>::from("s")]);
    }

    #[test]
    fn child_include_overrides_inherited_exclude() {
        let resource = Resource {
            name: "x".into(),
            kind: ResourceKind::Script,
            method: Method::Raw,
            value: "x()".into(),
            attributes: Default::default(),
            depends_on: vec![],
        };

        let root = Root {
            page: page("Home"),
            head: HeadData { resources: vec![resource], ..Default::default() },
        };

        let mut tree = Tree::new(Settings::default(), root, "/site", Origin::Synthetic);
        let blog = Listing {
            page: page("Blog"),
            head: HeadData { exclude: vec!["x".into()], ..Default::default() },
        };

        let hello = Post {
            page: page("Hello"),
            head: HeadData { include: vec!["x".into()], ..Default::default() },
            ..Default::default()
        };

        let blog = tree.insert(tree.root_id(), "blog", blog.into(), "/site/blog", Origin::Synthetic).unwrap();
        let hello = tree.insert(blog, "hello", hello.into(), "/site/blog/hello", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        let x = Arc::<str>::from("x");
        assert!(tree[blog].resources().is_empty());
        assert!(tree[blog].excludes().contains(&x));
        assert!(!tree[hello].excludes().contains(&x));
        assert_eq!(tree[hello].resources(), vec![x]);
        assert_eq!(tree.head(hello).scripts.len(), 1);
    }

    #[test]
    fn resolving_again_yields_identical_state() {
        let mut tree = tree();
        let root = tree.root_id();
        tree.insert(root, "about", post("About", &["meta"]), "/site/about", Origin::Synthetic).unwrap();
        let blog = tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();
        tree.insert(blog, "hello", post("Hello", &["rust", "meta"]), "/site/blog/hello", Origin::Synthetic).unwrap();
        tree.insert(blog, "again", post("Again", &["rust"]), "/site/blog/again", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        let snapshot = |tree: &Tree| {
            let nodes: Vec<_> = tree.iter_depth_first(tree.root_id())
                .map(|id| {
                    let node = &tree[id];
                    (node.page(), node.resources(), node.excludes(), node.tags(), node.fingerprint(), node.tag_cloud())
                })
                .collect();

            (nodes, tree.tag_cloud())
        };

        let before = snapshot(&tree);
        for id in tree.iter_depth_first(root).collect::<Vec<_>>() {
            tree.resolve(id).unwrap();
        }

        assert_eq!(snapshot(&tree), before);

        tree.refresh(root, None).unwrap();
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn locate_finds_the_deepest_source() {
        let mut tree = tree();
        let root = tree.root_id();
        let blog = tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Directory).unwrap();
        let post = tree.insert(blog, "hello", post("Hello", &[]), "/site/blog/2024-01-01-hello.md", Origin::File).unwrap();

        assert_eq!(tree.locate("/site/blog/2024-01-01-hello.md").unwrap(), post);
        assert_eq!(tree.locate("/site/blog/image.png").unwrap(), blog);
        assert_eq!(tree.locate("/site/other").unwrap(), root);
        assert_eq!(tree.locate("/elsewhere").unwrap_err().kind(), ErrorKind::Detached);
    }

    #[test]
    fn outline_draws_the_tree() {
        let mut tree = tree();
        let root = tree.root_id();
        let blog = tree.insert(root, "blog", listing("Blog"), "/site/blog", Origin::Synthetic).unwrap();
        tree.insert(blog, "hello", post("Hello", &[]), "/site/blog/hello", Origin::Synthetic).unwrap();
        tree.insert(root, "about", post("About", &[]), "/site/about", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        assert_eq!(tree.outline().to_string(), "\
/ [root] Home
├── blog [listing] Blog
│   └── hello [post] Hello
└── about [post] About
");
    }
}
