//! Meta-buildpack reference graph using `petgraph`.
//!
//! Lets the platform report cyclic and dangling order references before
//! any detection runs. Expansion performs the same cycle check lazily on
//! the active path, so this graph is a diagnostic, not a prerequisite.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use strata_common::error::StrataError;
use strata_common::types::ModuleKey;

use crate::order::{GroupElement, Order};
use crate::store::{DescriptorStore, ModuleLookup};

/// A group reference that names no installed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    /// Meta-buildpack whose order holds the reference; `None` for the
    /// platform order.
    pub referrer: Option<ModuleKey>,
    /// The dangling reference.
    pub reference: GroupElement,
}

/// Directed graph from each meta-buildpack to the modules its order names.
#[derive(Debug)]
pub struct ReferenceGraph {
    graph: DiGraph<ModuleKey, ()>,
    missing: Vec<MissingReference>,
}

impl ReferenceGraph {
    /// Builds the graph over every module in `store`, plus the references
    /// made by the platform `roots`.
    #[must_use]
    pub fn build(store: &DescriptorStore, roots: &[&Order]) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<ModuleKey, NodeIndex> = HashMap::new();
        let mut missing = Vec::new();

        for descriptor in store.iter() {
            let key = descriptor.key();
            let _ = nodes.entry(key.clone()).or_insert_with(|| graph.add_node(key));
        }

        let mut link = |referrer: Option<&ModuleKey>, order: &Order| {
            for element in order.iter().flat_map(|g| g.members.iter()) {
                let Ok(target) = store.lookup(element.kind, &element.id, &element.version) else {
                    missing.push(MissingReference {
                        referrer: referrer.cloned(),
                        reference: element.clone(),
                    });
                    continue;
                };
                if let (Some(from), Some(to)) = (referrer.and_then(|r| nodes.get(r)), nodes.get(&target.key())) {
                    let _ = graph.update_edge(*from, *to, ());
                }
            }
        };

        for root in roots {
            link(None, root);
        }
        for descriptor in store.iter().filter(|d| d.is_meta()) {
            link(Some(&descriptor.key()), &descriptor.order);
        }

        Self { graph, missing }
    }

    /// References that did not resolve to an installed module.
    #[must_use]
    pub fn missing(&self) -> &[MissingReference] {
        &self.missing
    }

    /// Every cycle among meta-buildpack references, one per strongly
    /// connected component.
    #[must_use]
    pub fn cycles(&self) -> Vec<StrataError> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| self.graph.contains_edge(n, n)))
            .map(|mut scc| {
                scc.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
                let path: Vec<String> = scc.iter().map(|&n| self.graph[n].to_string()).collect();
                StrataError::CyclicOrder {
                    module: path.first().cloned().unwrap_or_default(),
                    path,
                }
            })
            .collect()
    }
}
