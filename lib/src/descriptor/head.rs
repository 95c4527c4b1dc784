use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::{Resource, ResourceKind, Registry};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,
    pub content: String,
}

/// Declarative `<head>` metadata of a descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadData {
    pub meta: Vec<Meta>,
    /// Resources defined by this descriptor, in declaration order.
    pub resources: Vec<Resource>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl HeadData {
    /// Names of the resources this descriptor defines, in declaration order.
    pub fn local_names(&self) -> Vec<Arc<str>> {
        self.resources.iter().map(|r| r.name.as_str().into()).collect()
    }
}

/// A head ready for presentation: resource names materialized against the
/// registry and split by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Head {
    pub title: String,
    pub meta: Vec<Meta>,
    pub styles: Vec<Arc<Resource>>,
    pub scripts: Vec<Arc<Resource>>,
}

impl Head {
    pub fn materialize(title: &str, meta: &[Meta], names: &[Arc<str>], registry: &Registry) -> Head {
        let mut head = Head {
            title: title.to_string(),
            meta: meta.to_vec(),
            ..Default::default()
        };

        for name in names {
            let Some(resource) = registry.get(name) else {
                tracing::warn!(%name, "dropping unregistered resource from head");
                continue;
            };

            match resource.kind {
                ResourceKind::Style => head.styles.push(resource.clone()),
                ResourceKind::Script => head.scripts.push(resource.clone()),
            }
        }

        head
    }
}
