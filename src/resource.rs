//! Resource types - the merged view of identity, attributes and links
//!
//! A resource serializes as one flat JSON object:
//! `{"id": 1, "class": "person", "name": "John Doe", "links": {...}}`
//!
//! The snapshot cache stores the same encoding with `links` omitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map of a resource (name -> stored text)
pub type Attributes = BTreeMap<String, String>;

/// Link view grouped by link attribute, neighbors in discovery order
pub type LinkMap = BTreeMap<String, Vec<Linked>>;

/// Identity row of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meta {
    pub id: u64,
    pub class: String,
}

/// A neighbor in a link view: a bare id, or the resolved resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linked {
    Id(u64),
    Resource(Box<Resource>),
}

impl Linked {
    /// Id of the neighbor, whether resolved or not
    pub fn id(&self) -> u64 {
        match self {
            Linked::Id(id) => *id,
            Linked::Resource(resource) => resource.id,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Linked::Resource(resource) => Some(resource),
            Linked::Id(_) => None,
        }
    }
}

/// Links attached to a resource on request.
///
/// `from` groups the resources linking to this one, `to` groups the
/// resources this one links to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    pub from: LinkMap,
    pub to: LinkMap,
}

/// A typed, identified record: class + attribute map (+ optional links)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: u64,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Resource {
    /// Merge an identity row with its attributes
    pub fn from_parts(meta: Meta, attributes: Attributes) -> Self {
        Self {
            id: meta.id,
            class: meta.class,
            links: None,
            attributes,
        }
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Copy without the links view, as stored in the snapshot cache
    pub fn snapshot(&self) -> Resource {
        Resource {
            links: None,
            ..self.clone()
        }
    }
}
