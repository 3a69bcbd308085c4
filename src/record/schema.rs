//! Ordered, append-only record schemas

use serde::{Deserialize, Serialize};

use super::types::AttType;

/// A named, typed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub att_type: AttType,
}

/// Ordered list of attributes. Order is significant: slot `i` of a record holds
/// the value of attribute `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    atts: Vec<Attribute>,
}

impl Schema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self { atts: Vec::new() }
    }

    /// Builds a schema from `(name, type)` pairs
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, AttType)>) -> Self {
        let mut schema = Self::new();
        for (name, ty) in pairs {
            schema.append_att(name, ty);
        }
        schema
    }

    /// Appends an attribute at the end
    pub fn append_att(&mut self, name: impl Into<String>, att_type: AttType) {
        self.atts.push(Attribute {
            name: name.into(),
            att_type,
        });
    }

    /// Returns all attributes in order
    pub fn atts(&self) -> &[Attribute] {
        &self.atts
    }

    /// Returns the attribute at `index`
    pub fn att(&self, index: usize) -> Option<&Attribute> {
        self.atts.get(index)
    }

    /// Finds the first attribute named `name`
    pub fn find(&self, name: &str) -> Option<(usize, AttType)> {
        self.atts
            .iter()
            .position(|a| a.name == name)
            .map(|i| (i, self.atts[i].att_type))
    }

    pub fn len(&self) -> usize {
        self.atts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atts.is_empty()
    }
}
