use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Style,
    Script,
}

/// How a resource's `value` is acquired.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `value` is the literal content.
    Raw,
    /// `value` is a URL referenced as-is.
    Url,
    /// `value` is a file path relative to the declaring node's directory.
    Local,
}

/// A named style or script that pages can include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub method: Method,
    pub value: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, rename = "depends")]
    pub depends_on: Vec<String>,
}

/// The tree-wide resource table. The first definition of a name wins.
#[derive(Debug, Default)]
pub struct Registry {
    resources: FxHashMap<Arc<str>, Registered>,
}

#[derive(Debug, Clone)]
struct Registered {
    resource: Arc<Resource>,
    origin: Arc<str>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers `resource`, declared by the node at `origin`. A node may
    /// redefine its own resources. Returns `false` and logs a warning if
    /// another node took the name first; its definition is kept.
    pub fn register(&mut self, resource: &Resource, origin: &str) -> bool {
        if let Some(existing) = self.resources.get(resource.name.as_str()) {
            if &*existing.origin != origin {
                if *existing.resource != *resource {
                    tracing::warn!(
                        name = %resource.name,
                        first = %existing.origin,
                        rejected = %origin,
                        "resource already registered; keeping first definition"
                    );
                }

                return false;
            }
        }

        let registered = Registered {
            resource: Arc::new(resource.clone()),
            origin: origin.into(),
        };

        self.resources.insert(resource.name.as_str().into(), registered);
        true
    }

    /// Forgets every resource defined by the node at `origin`. Returns the
    /// number removed.
    pub fn withdraw(&mut self, origin: &str) -> usize {
        let before = self.resources.len();
        self.resources.retain(|_, r| &*r.origin != origin);
        before - self.resources.len()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Resource>> {
        self.resources.get(name).map(|r| &r.resource)
    }

    /// The path of the node that first defined `name`.
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(|r| &*r.origin)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Names in ascending order.
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.resources.keys().cloned().collect();
        names.sort();
        names
    }
}
