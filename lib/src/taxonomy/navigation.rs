use std::sync::Arc;

use chrono::NaiveDate;

use crate::descriptor::Link;
use crate::error::Result;
use crate::taxonomy::*;

struct Sibling {
    id: NodeId,
    date: Option<NaiveDate>,
    path: Arc<str>,
    title: String,
}

impl Sibling {
    fn link(&self) -> Link {
        Link::new(&*self.path, &self.title)
    }
}

impl Tree {
    /// Links the children of `parent` to each other by publish date, oldest
    /// first, and up to `parent`. Undated children sort first; children
    /// published on the same day sort by path. Unresolved children are
    /// resolved first.
    ///
    /// Relinking an unchanged set of children changes nothing.
    pub fn link_children(&self, parent: NodeId) -> Result<()> {
        let parent = &self[parent];
        let up = {
            let page = parent.state.read();
            Link::new(&*parent.path, &page.page.title)
        };

        let mut siblings = vec![];
        for id in parent.children() {
            let node = &self[id];
            node.resolve(self)?;

            let state = node.state.read();
            siblings.push(Sibling {
                id,
                date: state.page.date,
                path: node.path.clone(),
                title: state.page.title.clone(),
            });
        }

        siblings.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        for (i, sibling) in siblings.iter().enumerate() {
            let prev = i.checked_sub(1).map_or_else(Link::default, |j| siblings[j].link());
            let next = siblings.get(i + 1).map_or_else(Link::default, Sibling::link);

            let mut state = self[sibling.id].state.write();
            state.page.up = up.clone();
            state.page.prev = prev;
            state.page.next = next;
        }

        Ok(())
    }
}
