#![forbid(unsafe_code)]

use std::collections::HashMap;

use matl_ir::Tag;
use tracing::trace;

use crate::{Element, Transaction, Visibility};

#[derive(Clone, Debug)]
struct Record {
    name: String,
    element: Element,
    visibility: Visibility,
}

/// In-memory registry with a single scope. Each `&mut` borrow acts as one transaction.
#[derive(Debug, Default)]
pub struct Database {
    records: HashMap<Tag, Record>,
    names: HashMap<String, Tag>,
    next_tag: u32,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of browsable records, sorted. Reference-counted records are omitted.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .values()
            .filter(|r| r.visibility == Visibility::Browsable)
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn visibility(&self, tag: Tag) -> Option<Visibility> {
        self.records.get(&tag).map(|r| r.visibility)
    }
}

impl Transaction for Database {
    fn name_to_tag(&self, name: &str) -> Option<Tag> {
        self.names.get(name).copied()
    }

    fn tag_to_name(&self, tag: Tag) -> Option<String> {
        self.records.get(&tag).map(|r| r.name.clone())
    }

    fn access(&self, tag: Tag) -> Option<Element> {
        self.records.get(&tag).map(|r| r.element.clone())
    }

    fn reserve_tag(&mut self) -> Tag {
        // Tag(0) is never handed out.
        self.next_tag += 1;
        Tag(self.next_tag)
    }

    fn store(&mut self, tag: Tag, element: Element, name: &str, visibility: Visibility) {
        trace!(tag = tag.0, record = name, ?visibility, "store");
        self.names.insert(name.to_string(), tag);
        self.records.insert(
            tag,
            Record {
                name: name.to_string(),
                element,
                visibility,
            },
        );
    }
}
