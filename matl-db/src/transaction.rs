#![forbid(unsafe_code)]

use std::sync::Arc;

use matl_ir::{Definition, DefinitionKind, ElementKind, Instance, Module, Resource, Tag};

/// A registry record. Records are immutable once stored.
#[derive(Clone, Debug)]
pub enum Element {
    Module(Arc<Module>),
    Definition(Arc<Definition>),
    Instance(Arc<Instance>),
    Resource(Arc<Resource>),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Module(_) => ElementKind::Module,
            Element::Definition(d) => match d.kind {
                DefinitionKind::Function => ElementKind::FunctionDefinition,
                DefinitionKind::Material => ElementKind::MaterialDefinition,
            },
            Element::Instance(i) => match i.kind {
                DefinitionKind::Function => ElementKind::FunctionCall,
                DefinitionKind::Material => ElementKind::MaterialInstance,
            },
            Element::Resource(_) => ElementKind::Resource,
        }
    }
}

/// How a named record is exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Listed in the public namespace.
    Browsable,
    /// Resolvable by name and identity, but not listed; lives as long as something refers to it.
    ReferenceCounted,
}

/// Name and identity registry. Check-then-store sequences are consistent within one
/// transaction; implementations provide whatever isolation they offer across transactions.
pub trait Transaction {
    fn name_to_tag(&self, name: &str) -> Option<Tag>;

    fn tag_to_name(&self, tag: Tag) -> Option<String>;

    fn access(&self, tag: Tag) -> Option<Element>;

    fn reserve_tag(&mut self) -> Tag;

    /// Stores `element` under a reserved `tag` and binds `name` to it.
    fn store(&mut self, tag: Tag, element: Element, name: &str, visibility: Visibility);

    fn kind_of(&self, tag: Tag) -> Option<ElementKind> {
        self.access(tag).map(|e| e.kind())
    }

    fn store_new(&mut self, element: Element, name: &str) -> Tag {
        let tag = self.reserve_tag();
        self.store(tag, element, name, Visibility::Browsable);
        tag
    }

    fn store_for_reference_counting(&mut self, tag: Tag, element: Element, name: &str) {
        self.store(tag, element, name, Visibility::ReferenceCounted);
    }

    fn module(&self, tag: Tag) -> Option<Arc<Module>> {
        match self.access(tag)? {
            Element::Module(m) => Some(m),
            _ => None,
        }
    }

    fn definition(&self, tag: Tag) -> Option<Arc<Definition>> {
        match self.access(tag)? {
            Element::Definition(d) => Some(d),
            _ => None,
        }
    }

    fn instance(&self, tag: Tag) -> Option<Arc<Instance>> {
        match self.access(tag)? {
            Element::Instance(i) => Some(i),
            _ => None,
        }
    }

    fn resource(&self, tag: Tag) -> Option<Arc<Resource>> {
        match self.access(tag)? {
            Element::Resource(r) => Some(r),
            _ => None,
        }
    }
}
