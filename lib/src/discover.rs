use std::path::Path;

use chrono::NaiveDate;

use crate::descriptor::{Descriptor, Listing, PageData, Post, Root};
use crate::error::{Chainable, Error, Kind, Result};
use crate::fstree::{Entry, EntryId, FsTree};
use crate::settings::Settings;
use crate::taxonomy::{NodeId, Origin, Tree};
use crate::util::{slugify, titleize};

/// Builds and resolves the tree rooted at `root`, with the settings found
/// there.
pub fn discover<P: AsRef<Path>>(root: P) -> Result<Tree> {
    let settings = Settings::discover(root.as_ref())?;
    discover_with(root, settings)
}

/// Builds and resolves the tree rooted at `root`.
///
/// Directories are visited depth first, in file name order. Every child is
/// resolved as soon as it is created, and siblings are linked once all of
/// them exist.
pub fn discover_with<P: AsRef<Path>>(root: P, settings: Settings) -> Result<Tree> {
    let root = root.as_ref();
    let root = root.canonicalize()
        .map_err(|e| Error::from(e).with_kind(Kind::Unreadable))
        .chain_with(|| error!("failed to open content root", "root" => root.display()))?;

    let fs = crate::time!("walk", FsTree::build(&root)?);
    let (descriptor, origin) = match fs.get_file(fs.root_id(), &settings.descriptor) {
        Some(file) => (Descriptor::read(&file.path)?, Origin::Descriptor(file.path.clone())),
        None => {
            tracing::debug!(root = %root.display(), "no root descriptor; using defaults");
            (Descriptor::Root(Root::default()), Origin::Synthetic)
        }
    };

    let descriptor = match descriptor {
        Descriptor::Root(descriptor) => descriptor,
        other => return Err(error! {
            "the content root must be of kind root",
            "root" => root.display(),
            "kind" => other.kind(),
        }.with_kind(Kind::Conflict)),
    };

    let mut tree = Tree::new(settings, descriptor, &root, origin);
    let root_id = tree.root_id();
    tree.resolve(root_id)?;

    let discovery = Discovery { fs: &fs };
    crate::time!("discover", discovery.walk(&mut tree, fs.root_id(), root_id)?);

    tracing::info!(root = %root.display(), nodes = tree.len(), "discovered content tree");
    Ok(tree)
}

struct Discovery<'a> {
    fs: &'a FsTree,
}

struct Candidate {
    name: String,
    descriptor: Descriptor,
    origin: Origin,
}

impl Discovery<'_> {
    fn walk(&self, tree: &mut Tree, dir: EntryId, node: NodeId) -> Result<()> {
        for &child in &self.fs[dir].children {
            let entry = &self.fs[child];
            let result = self.classify(tree.settings(), entry)
                .and_then(|candidate| match candidate {
                    Some(candidate) => self.grow(tree, node, entry, candidate),
                    None => Ok(()),
                });

            if let Err(e) = result {
                if tree.settings().strict {
                    return Err(e.chain(error!("discovery failed", "path" => entry.path.display())));
                }

                tracing::warn!(path = %entry.path.display(), kind = ?e.kind(), "skipping subtree: {e}");
            }
        }

        tree.link_children(node)
    }

    fn grow(&self, tree: &mut Tree, parent: NodeId, entry: &Entry, candidate: Candidate) -> Result<()> {
        let id = tree.insert(parent, &candidate.name, candidate.descriptor, &entry.path, candidate.origin)?;
        tree.resolve(id)?;
        if entry.is_dir() {
            self.walk(tree, entry.id, id)?;
        }

        Ok(())
    }

    fn classify(&self, settings: &Settings, entry: &Entry) -> Result<Option<Candidate>> {
        if entry.is_dir() {
            if let Some(file) = self.fs.get_file(entry.id, &settings.descriptor) {
                let mut descriptor = Descriptor::read(&file.path)?;
                match &mut descriptor {
                    Descriptor::Root(_) => return Err(error! {
                        "only the content root may be of kind root",
                        "descriptor" => file.path.display(),
                    }.with_kind(Kind::Conflict)),
                    Descriptor::Post(post) => {
                        let content = post.content.get_or_insert_with(|| settings.content.clone());
                        if self.fs.get_file(entry.id, &*content).is_none() {
                            return Err(error! {
                                "post has no content file",
                                "post" => entry.path.display(),
                                "expected" => content,
                            }.with_kind(Kind::MissingContent));
                        }
                    }
                    _ => {}
                }

                return Ok(Some(Candidate {
                    name: entry.file_name.clone(),
                    descriptor,
                    origin: Origin::Descriptor(file.path.clone()),
                }));
            }

            if settings.is_listing_name(&entry.file_name) {
                let listing = Listing {
                    page: PageData { title: titleize(&entry.file_name), ..Default::default() },
                    ..Default::default()
                };

                return Ok(Some(Candidate {
                    name: entry.file_name.clone(),
                    descriptor: listing.into(),
                    origin: Origin::Directory,
                }));
            }

            return Ok(None);
        }

        let is_post = entry.is_file()
            && entry.file_ext().map_or(false, |ext| settings.is_post_extension(ext));

        match is_post.then(|| dated_slug(entry.file_stem())).flatten() {
            Some((_, slug)) if slugify(slug).is_empty() => {
                tracing::warn!(path = %entry.path.display(), "dated file has no usable slug; skipping");
                Ok(None)
            }
            Some((date, slug)) => {
                let post = Post {
                    page: PageData {
                        title: titleize(slug),
                        date: Some(date),
                        ..Default::default()
                    },
                    content: Some(entry.file_name.clone()),
                    ..Default::default()
                };

                Ok(Some(Candidate {
                    name: slugify(slug),
                    descriptor: post.into(),
                    origin: Origin::File,
                }))
            }
            None => Ok(None),
        }
    }
}

/// Splits a `YYYY-MM-DD-slug` file stem into its date and slug.
fn dated_slug(stem: &str) -> Option<(NaiveDate, &str)> {
    let (date, slug) = (stem.get(..10)?, stem.get(10..)?);
    let slug = slug.strip_prefix('-').filter(|s| !s.is_empty())?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((date, slug))
}
