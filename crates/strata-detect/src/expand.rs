//! Lazy flattening of nested orders into concrete candidate groups.
//!
//! Candidates come out depth-first, left to right: a meta-buildpack member
//! is replaced in place by each of its own group alternatives in turn. The
//! expander only looks at a branch when the previous candidate has been
//! consumed, so a group that resolves early never pays for the rest.

use std::collections::VecDeque;

use strata_buildpack::{Group, GroupElement, ModuleLookup, Order, OrderDocument};
use strata_common::error::{Result, StrataError};
use strata_common::types::{ModuleKey, ModuleKind};

/// Builds the root order: when extension groups exist, each buildpack group
/// is preceded by one variant per extension group with all extensions
/// optional, followed by the group alone.
#[must_use]
pub fn with_extensions(order: &Order, order_ext: &Order) -> Order {
    if order_ext.is_empty() {
        return order.clone();
    }
    let mut expanded = Vec::with_capacity(order.len() * (order_ext.len() + 1));
    for group in order {
        for ext in order_ext {
            let ext = Group::new(ext.members.iter().cloned().map(GroupElement::optional).collect())
                .with_kind(ModuleKind::Extension);
            expanded.push(ext.append(group));
        }
        expanded.push(group.clone());
    }
    expanded
}

#[derive(Debug, Clone)]
struct Item {
    element: GroupElement,
    // Meta-buildpacks on the active expansion path above this element.
    ancestors: Vec<ModuleKey>,
}

#[derive(Debug)]
struct Pending {
    done: Vec<GroupElement>,
    todo: VecDeque<Item>,
}

/// Iterator over the concrete groups of an order.
///
/// Yields an error and stops when a reference cannot be resolved or a
/// meta-buildpack reappears on its own expansion path.
#[derive(Debug)]
pub struct OrderExpander<'a, L> {
    lookup: &'a L,
    stack: Vec<Pending>,
}

impl<'a, L: ModuleLookup> OrderExpander<'a, L> {
    /// Expands `order` with references resolved through `lookup`.
    #[must_use]
    pub fn new(lookup: &'a L, order: &Order) -> Self {
        let stack = order
            .iter()
            .rev()
            .map(|group| Pending {
                done: Vec::new(),
                todo: group
                    .members
                    .iter()
                    .map(|element| Item {
                        element: element.clone(),
                        ancestors: Vec::new(),
                    })
                    .collect(),
            })
            .collect();
        Self { lookup, stack }
    }

    /// Expands an order document, extensions included.
    #[must_use]
    pub fn for_document(lookup: &'a L, doc: &OrderDocument) -> Self {
        Self::new(lookup, &with_extensions(&doc.order, &doc.order_ext))
    }

    fn advance(&mut self, mut state: Pending) -> Result<Option<Group>> {
        let lookup = self.lookup;
        while let Some(item) = state.todo.pop_front() {
            let element = &item.element;
            if state.done.iter().any(|d| d.id == element.id) {
                tracing::debug!(module = %element, "skipping repeated module in group");
                continue;
            }
            let descriptor = lookup.lookup(element.kind, &element.id, &element.version)?;
            if !descriptor.is_meta() {
                state.done.push(item.element);
                continue;
            }

            let key = descriptor.key();
            if item.ancestors.contains(&key) {
                let mut path: Vec<String> = item.ancestors.iter().map(ToString::to_string).collect();
                path.push(key.to_string());
                return Err(StrataError::CyclicOrder {
                    module: key.to_string(),
                    path,
                });
            }
            let mut ancestors = item.ancestors.clone();
            ancestors.push(key);

            tracing::trace!(module = %element, alternatives = descriptor.order.len(), "expanding meta-buildpack");
            for group in descriptor.order.iter().rev().filter(|g| !g.is_empty()) {
                let mut todo: VecDeque<Item> = group
                    .members
                    .iter()
                    .map(|child| Item {
                        element: GroupElement {
                            optional: child.optional || element.optional,
                            ..child.clone()
                        },
                        ancestors: ancestors.clone(),
                    })
                    .collect();
                todo.extend(state.todo.iter().cloned());
                self.stack.push(Pending {
                    done: state.done.clone(),
                    todo,
                });
            }
            return Ok(None);
        }
        Ok(Some(Group::new(state.done)))
    }
}

impl<L: ModuleLookup> Iterator for OrderExpander<'_, L> {
    type Item = Result<Group>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(state) = self.stack.pop() {
            match self.advance(state) {
                Ok(Some(group)) => return Some(Ok(group)),
                Ok(None) => {}
                Err(err) => {
                    self.stack.clear();
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
