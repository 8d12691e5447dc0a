//! Fixtures shared by the unit tests.

use std::path::PathBuf;

use strata_buildpack::{Descriptor, DescriptorStore, Group, GroupElement, ModuleInfo, Order};
use strata_common::types::ModuleKind;

pub fn module(kind: ModuleKind, id: &str) -> Descriptor {
    Descriptor {
        api: "0.10".into(),
        kind,
        info: ModuleInfo {
            id: id.into(),
            version: "1".into(),
            ..ModuleInfo::default()
        },
        order: Vec::new(),
        dir: PathBuf::from("/cnb/buildpacks").join(id).join("1"),
    }
}

pub fn bp(id: &str) -> Descriptor {
    module(ModuleKind::Buildpack, id)
}

pub fn ext(id: &str) -> Descriptor {
    module(ModuleKind::Extension, id)
}

pub fn meta(id: &str, order: Order) -> Descriptor {
    Descriptor { order, ..bp(id) }
}

pub fn req(id: &str) -> GroupElement {
    GroupElement::buildpack(id, "1")
}

pub fn opt(id: &str) -> GroupElement {
    req(id).optional()
}

pub fn group(members: Vec<GroupElement>) -> Group {
    Group::new(members)
}

pub fn store(descriptors: Vec<Descriptor>) -> DescriptorStore {
    DescriptorStore::from_descriptors(descriptors).expect("store")
}

pub fn ids(group: &Group) -> Vec<&str> {
    group.members.iter().map(|m| m.id.as_str()).collect()
}
