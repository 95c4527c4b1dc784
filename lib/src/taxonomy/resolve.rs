//! Resolution: merging inherited state into a node.
//!
//! ```text
//!   parent (resolved)             node (raw descriptor)
//!   +-----------------+           +-------------------------+
//!   | page data       |--fill---->| page data               |
//!   | resources [a,b] |--union--->| include [c]  exclude [b]|
//!   | excludes  [x]   |--minus--->| local [d]               |
//!   +-----------------+           +-------------------------+
//!                                          |
//!                         include/exclude, dependency closure
//!                                          v
//!                                 resources [d, c, a, deps..]
//! ```

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::descriptor::{Descriptor, HeadData, ImageDescriptor, Kind, Method, PageData, Registry};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::taxonomy::*;

/// What a child inherits from its resolved parent.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inherited {
    pub page: PageData,
    pub resources: Vec<Arc<str>>,
    pub excludes: Vec<Arc<str>>,
}

impl Node {
    fn inheritance(&self) -> Inherited {
        let state = self.state.read();
        Inherited {
            page: state.page.clone(),
            resources: state.resources.clone(),
            excludes: state.excludes.clone(),
        }
    }

    /// Resolves this node against its parent, resolving the parent first if
    /// needed. Resolving an already resolved node does nothing.
    ///
    /// # Panics
    ///
    /// If a node other than the root has no parent.
    pub fn resolve(&self, tree: &Tree) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }

        let inherited = match self.parent {
            Some(parent) => {
                let parent = &tree[parent];
                parent.resolve(tree)?;
                Some(parent.inheritance())
            }
            None if self.kind == Kind::Root => None,
            None => panic!("{} node {} has no parent", self.kind, self.path),
        };

        let mut state = self.state.write();
        if state.resolved {
            return Ok(());
        }

        let descriptor = state.descriptor.clone();
        let head = descriptor.head().clone();
        let inherited = inherited.unwrap_or_default();

        let mut page = descriptor.page().clone();
        page.path = self.path.to_string();
        page.parent = inherited.page.path.clone();
        page.inherit(&inherited.page);

        {
            let mut registry = tree.registry.write();
            for resource in &head.resources {
                registry.register(resource, &self.path);
            }
        }

        let include = effective_include(&head.include, &inherited.resources);
        let excludes = effective_exclude(&inherited.excludes, &head.include, &head.exclude);
        let selected = include_exclude(&self.path, &head.local_names(), &include, &excludes);
        let resources = close(&self.path, selected, &tree.registry.read());

        let images = match &descriptor {
            Descriptor::Gallery(gallery) => resolve_images(&gallery.images, &page, self.clock),
            _ => vec![],
        };

        let fingerprint = Fingerprint::new(page.date, page.updated, &page.title, self.clock);
        let tags = dedup(descriptor.tags().iter().map(String::as_str));
        let deps = self.dependencies_of(&descriptor, &head);

        *state = State {
            resolved: true,
            descriptor,
            page,
            head,
            resources,
            excludes,
            tags: tags.clone(),
            images: images.clone(),
            deps,
            registrations: vec![],
        };

        self.fingerprint.set(fingerprint);
        drop(state);

        let registrations = self.register_tags(tree, fingerprint, &tags, &images);
        self.state.write().registrations = registrations;
        tracing::debug!(path = %self.path, id = %fingerprint, "resolved");
        Ok(())
    }

    /// Registers the node and its images under their tags. Only insertions
    /// that took effect are returned.
    fn register_tags(
        &self,
        tree: &Tree,
        id: Fingerprint,
        tags: &[Arc<str>],
        images: &[Arc<Image>],
    ) -> Vec<Registration> {
        let mut registrations = vec![];
        if !tags.is_empty() {
            let item: Arc<dyn Listable> = tree.node(self.id).clone();
            let local = self.parent.map(|p| &tree[p]).filter(|p| !p.is_root());
            for tag in tags {
                if tree.tags.write().insert(tag, id, item.clone()) {
                    registrations.push(Registration { tag: tag.clone(), id, local: false, image: None });
                }

                if let Some(parent) = local {
                    if parent.index.write().insert(tag, id, item.clone()) {
                        registrations.push(Registration { tag: tag.clone(), id, local: true, image: None });
                    }
                }
            }
        }

        for image in images {
            for tag in &image.tags {
                let item: Arc<dyn Listable> = image.clone();
                if tree.tags.write().insert(tag, image.fingerprint, item) {
                    registrations.push(Registration {
                        tag: tag.clone(),
                        id: image.fingerprint,
                        local: false,
                        image: Some(image.clone()),
                    });
                }
            }
        }

        registrations
    }

    /// Forgets the resolved state, withdraws the tag registrations this node
    /// made and the resources it defined.
    pub(crate) fn invalidate(&self, tree: &Tree) {
        let registrations = {
            let mut state = self.state.write();
            state.resolved = false;
            self.fingerprint.take();
            std::mem::take(&mut state.registrations)
        };

        tree.registry.write().withdraw(&self.path);

        let node: Arc<dyn Listable> = tree.node(self.id).clone();
        let parent = self.parent.map(|p| &tree[p]);
        for registration in registrations {
            let Registration { tag, id, local, image } = registration;
            let item = match image {
                Some(image) => image as Arc<dyn Listable>,
                None => node.clone(),
            };

            match (local, parent) {
                (true, Some(parent)) => parent.index.write().remove(&tag, id, &item),
                (true, None) => false,
                (false, _) => tree.tags.write().remove(&tag, id, &item),
            };
        }
    }

    fn dependencies_of(&self, descriptor: &Descriptor, head: &HeadData) -> FxHashMap<Arc<Path>, Dependency> {
        let mut deps = FxHashMap::default();
        if let Origin::Descriptor(file) = &self.origin {
            deps.insert(file.clone(), Dependency::Descriptor);
        }

        if let Descriptor::Post(post) = descriptor {
            if let Some(content) = &post.content {
                deps.insert(self.dir().join(content).into(), Dependency::Markdown);
            }
        }

        for resource in head.resources.iter().filter(|r| r.method == Method::Local) {
            deps.insert(self.dir().join(&resource.value).into(), Dependency::Resource);
        }

        deps
    }
}

fn resolve_images(images: &[ImageDescriptor], gallery: &PageData, now: chrono::NaiveDate) -> Vec<Arc<Image>> {
    images.par_iter()
        .map(|image| Arc::new(Image::resolve(image, gallery, now)))
        .collect()
}

fn push_unique(names: &mut Vec<Arc<str>>, name: &str) -> bool {
    if names.iter().any(|n| &**n == name) {
        return false;
    }

    names.push(name.into());
    true
}

fn contains(names: &[Arc<str>], name: &str) -> bool {
    names.iter().any(|n| &**n == name)
}

/// The node's own includes followed by the parent's resources, without
/// duplicates.
pub fn effective_include(include: &[String], parent: &[Arc<str>]) -> Vec<Arc<str>> {
    let mut names = Vec::with_capacity(include.len() + parent.len());
    for name in include.iter().map(String::as_str).chain(parent.iter().map(|n| &**n)) {
        push_unique(&mut names, name);
    }

    names
}

/// The parent's excludes minus whatever the node includes itself, followed
/// by the node's own excludes.
pub fn effective_exclude(parent: &[Arc<str>], include: &[String], exclude: &[String]) -> Vec<Arc<str>> {
    let mut names = vec![];
    for name in parent.iter().map(|n| &**n) {
        if !include.iter().any(|i| i == name) {
            push_unique(&mut names, name);
        }
    }

    for name in exclude {
        push_unique(&mut names, name);
    }

    names
}

/// Combines locally defined resources with the effective include and
/// exclude sets. Excluded locals are dropped. Locals that are also included
/// keep their position in the include order instead.
pub fn include_exclude(
    path: &str,
    local: &[Arc<str>],
    include: &[Arc<str>],
    exclude: &[Arc<str>],
) -> Vec<Arc<str>> {
    let mut names = vec![];
    for name in local {
        if contains(exclude, name) {
            tracing::warn!(%path, %name, "local resource is excluded; dropping it");
        } else if contains(include, name) {
            tracing::warn!(%path, %name, "local resource is already defined by an include");
        } else {
            push_unique(&mut names, name);
        }
    }

    for name in include {
        if !contains(exclude, name) {
            push_unique(&mut names, name);
        }
    }

    names
}

/// Appends the registered dependencies of every name until nothing new is
/// added. Unregistered names are dropped.
pub fn close(path: &str, mut names: Vec<Arc<str>>, registry: &Registry) -> Vec<Arc<str>> {
    let mut i = 0;
    while i < names.len() {
        match registry.get(&names[i]) {
            Some(resource) => {
                for dep in &resource.depends_on {
                    push_unique(&mut names, dep);
                }

                i += 1;
            }
            None => {
                tracing::warn!(%path, name = %names[i], "dropping unregistered resource");
                names.remove(i);
            }
        }
    }

    names
}
