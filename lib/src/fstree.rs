use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::{Kind, Result};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory tree, walked in parallel.
///
/// Children of every directory are sorted by file name. Hidden entries are
/// skipped.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

impl FsTree {
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(error! {
                "content root is not a directory",
                "root" => root.display(),
            }.with_kind(Kind::Unreadable));
        }

        let walker = jwalk::WalkDir::new(root)
            .follow_links(true)
            .skip_hidden(true)
            .sort(true);

        let mut tree = FsTree { entries: vec![], map: FxHashMap::default() };
        for entry in walker {
            match entry {
                Ok(entry) => { tree.insert(entry); }
                Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
            }
        }

        if tree.entries.is_empty() {
            return Err(error! {
                "file system walk yielded no entries",
                "root" => root.display(),
            }.with_kind(Kind::Unreadable));
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    /// The entry at `path` relative to the directory `dir`.
    #[inline]
    pub fn get<P: AsRef<Path>>(&self, dir: EntryId, path: P) -> Option<&Entry> {
        self.get_id(dir, path).map(|id| &self[id])
    }

    /// Like [`FsTree::get()`], but only finds regular files.
    pub fn get_file<P: AsRef<Path>>(&self, dir: EntryId, path: P) -> Option<&Entry> {
        self.get(dir, path).filter(|entry| entry.is_file())
    }

    pub fn get_id<P: AsRef<Path>>(&self, dir: EntryId, path: P) -> Option<EntryId> {
        let full_path = self[dir].path.join(path.as_ref());
        self.map.get(&*full_path).cloned()
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) -> EntryId {
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(entry.path().into_boxed_path()),
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        let id = entry.id;
        self.entries.push(entry);
        id
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((left, _)) if !left.is_empty() => left,
            _ => &self.file_name,
        }
    }

    /// The last extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        match self.file_name.rsplit_once('.') {
            Some((left, right)) if !left.is_empty() => Some(right),
            _ => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.file_type.is_file()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
