use std::sync::Arc;

use serde::Serialize;

use canopy::descriptor::{Kind, Meta, PageData, Resource};
use canopy::error::Result;
use canopy::fingerprint::Fingerprint;
use canopy::{FeedEntry, Listable, Node, Renderer, Tree};

/// The resolved state of a whole tree.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub nodes: Vec<NodeRecord>,
    pub tags: Vec<TagRecord>,
    pub resources: Vec<Arc<Resource>>,
}

#[derive(Debug, Serialize)]
pub struct NodeRecord {
    pub id: Fingerprint,
    pub kind: Kind,
    pub page: PageData,
    pub meta: Vec<Meta>,
    pub resources: Vec<Arc<str>>,
    pub tags: Vec<Arc<str>>,
    pub images: Vec<FeedEntry>,
}

#[derive(Debug, Serialize)]
pub struct TagRecord {
    pub tag: Arc<str>,
    pub items: Vec<FeedEntry>,
}

/// Renders every node into a [`NodeRecord`].
pub struct ManifestRenderer;

impl Renderer for ManifestRenderer {
    type Output = Vec<NodeRecord>;
    type Render = NodeRecord;

    fn render_node(&self, tree: &Tree, node: &Arc<Node>) -> Result<NodeRecord> {
        Ok(NodeRecord {
            id: node.fingerprint(),
            kind: node.kind,
            page: node.page(),
            meta: node.head(tree).meta,
            resources: node.resources(),
            tags: node.tags(),
            images: node.images().iter().map(|image| image.feed_entry()).collect(),
        })
    }
}

impl Manifest {
    pub fn build(tree: &Tree) -> Result<Manifest> {
        let nodes = ManifestRenderer.render_tree(tree)?;
        let tags = tree.tag_cloud().into_iter()
            .map(|(tag, _)| TagRecord {
                items: tree.tagged(&tag).iter().map(|item| item.feed_entry()).collect(),
                tag,
            })
            .collect();

        let resources = tree.resource_names().iter()
            .filter_map(|name| tree.resource(name))
            .collect();

        Ok(Manifest { nodes, tags, resources })
    }
}
