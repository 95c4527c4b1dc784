use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::fingerprint::Fingerprint;
use crate::taxonomy::Listable;

/// A mapping from tag to the items registered under it.
///
/// Items are kept in first-registration order and identified by their
/// fingerprint: registering the same item under the same tag twice is a
/// no-op.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: FxHashMap<Arc<str>, TagList>,
}

#[derive(Debug, Default)]
struct TagList {
    items: Vec<(Fingerprint, Arc<dyn Listable>)>,
    seen: FxHashSet<Fingerprint>,
}

impl TagIndex {
    pub fn new() -> Self {
        TagIndex::default()
    }

    /// Registers `item`, identified by `id`, under `tag`. Returns `false` if
    /// it was already registered there.
    pub fn insert(&mut self, tag: &str, id: Fingerprint, item: Arc<dyn Listable>) -> bool {
        let list = self.tags.entry(tag.into()).or_default();
        if !list.seen.insert(id) {
            return false;
        }

        list.items.push((id, item));
        true
    }

    /// The items tagged `tag`, in registration order. An unknown tag yields
    /// an empty list.
    pub fn get(&self, tag: &str) -> Vec<Arc<dyn Listable>> {
        match self.tags.get(tag) {
            Some(list) => list.items.iter().map(|(_, item)| item.clone()).collect(),
            None => {
                tracing::warn!(%tag, "lookup of unknown tag");
                vec![]
            }
        }
    }

    pub fn contains(&self, tag: &str, id: Fingerprint) -> bool {
        self.tags.get(tag).map_or(false, |list| list.seen.contains(&id))
    }

    /// Withdraws the registration of `item` under `tag`. Another item that
    /// shares `id` is left in place. Returns `false` if nothing was removed.
    pub fn remove(&mut self, tag: &str, id: Fingerprint, item: &Arc<dyn Listable>) -> bool {
        let Some(list) = self.tags.get_mut(tag) else {
            return false;
        };

        let Some(i) = list.items.iter().position(|(k, v)| *k == id && same(v, item)) else {
            return false;
        };

        list.items.remove(i);
        list.seen.remove(&id);
        if list.items.is_empty() {
            self.tags.remove(tag);
        }

        true
    }

    /// Every tag with the number of items under it, by tag name.
    pub fn cloud(&self) -> Vec<(Arc<str>, usize)> {
        let mut cloud: Vec<_> = self.tags.iter()
            .map(|(tag, list)| (tag.clone(), list.items.len()))
            .collect();

        cloud.sort();
        cloud
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

fn same(a: &Arc<dyn Listable>, b: &Arc<dyn Listable>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::FeedEntry;
    use chrono::NaiveDate;

    #[derive(Debug)]
    struct Item(&'static str, Fingerprint);

    impl Listable for Item {
        fn date(&self) -> Option<NaiveDate> { None }
        fn identifier(&self) -> Fingerprint { self.1 }
        fn title(&self) -> String { self.0.into() }
        fn feed_entry(&self) -> FeedEntry {
            FeedEntry {
                id: self.1,
                title: self.0.into(),
                link: String::new(),
                date: None,
                author: String::new(),
                description: String::new(),
            }
        }
    }

    fn item(title: &'static str, bits: u64) -> (Fingerprint, Arc<dyn Listable>) {
        let id = Fingerprint::from_bits(bits);
        (id, Arc::new(Item(title, id)))
    }

    #[test]
    fn registration_is_idempotent_and_ordered() {
        let mut index = TagIndex::new();
        let (a, first) = item("first", 1);
        let (b, second) = item("second", 2);

        assert!(index.insert("rust", b, second.clone()));
        assert!(index.insert("rust", a, first.clone()));
        assert!(!index.insert("rust", b, second));

        let titles: Vec<_> = index.get("rust").iter().map(|i| i.title()).collect();
        assert_eq!(titles, ["second", "first"]);
        assert!(index.get("cooking").is_empty());
    }

    #[test]
    fn removal_drops_empty_tags() {
        let mut index = TagIndex::new();
        let (a, first) = item("first", 1);
        let (b, second) = item("second", 2);
        index.insert("rust", a, first.clone());
        index.insert("notes", a, first.clone());
        index.insert("notes", b, second);

        assert!(index.remove("rust", a, &first));
        assert!(index.remove("notes", a, &first));
        assert!(!index.remove("notes", a, &first));
        assert!(!index.contains("notes", a));
        assert!(index.contains("notes", b));
        assert_eq!(index.cloud(), vec![(Arc::<str>::from("notes"), 1)]);
    }

    #[test]
    fn removal_spares_items_sharing_a_fingerprint() {
        let mut index = TagIndex::new();
        let (id, first) = item("first", 7);
        let twin: Arc<dyn Listable> = Arc::new(Item("twin", id));

        assert!(index.insert("rust", id, first.clone()));
        assert!(!index.insert("rust", id, twin.clone()));
        assert!(!index.remove("rust", id, &twin));

        let titles: Vec<_> = index.get("rust").iter().map(|i| i.title()).collect();
        assert_eq!(titles, ["first"]);
        assert!(index.remove("rust", id, &first));
        assert!(index.is_empty());
    }
}
