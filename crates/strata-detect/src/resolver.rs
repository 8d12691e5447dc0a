//! Matching requires against provides across one candidate group.
//!
//! Every combination of the members' plan alternatives is a trial, tried
//! depth-first with the first member's alternatives varying slowest. A
//! trial walks its members in group order; each member's requires must be
//! met by provides of an earlier member or of itself.

use std::collections::HashSet;

use strata_buildpack::{BuildPlan, BuildPlanEntry, Group, GroupElement, PlanSections};

/// A member that passed detection, with its plan alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Resolved reference; `optional` is the member's optionality.
    pub element: GroupElement,
    /// Plan alternatives, primary first. Never empty.
    pub alternatives: Vec<PlanSections>,
}

/// An accepted group and its build plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Members kept, in group order, all marked required.
    pub group: Group,
    /// Merged plan.
    pub plan: BuildPlan,
}

#[derive(Debug, Clone)]
struct TrialEntry<'a> {
    element: &'a GroupElement,
    optional: bool,
    sections: &'a PlanSections,
}

/// Resolves the first satisfiable trial, if any.
#[must_use]
pub fn resolve(contributions: &[Contribution]) -> Option<Resolution> {
    let mut trial = Vec::with_capacity(contributions.len());
    search(contributions, &mut trial)
}

fn search<'a>(rest: &'a [Contribution], trial: &mut Vec<TrialEntry<'a>>) -> Option<Resolution> {
    let Some((first, rest)) = rest.split_first() else {
        return run_trial(trial.clone());
    };
    let last = first.alternatives.len().saturating_sub(1);
    for (i, sections) in first.alternatives.iter().enumerate() {
        trial.push(TrialEntry {
            element: &first.element,
            optional: first.element.optional && i == last,
            sections,
        });
        let found = search(rest, trial);
        let _ = trial.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn run_trial(mut trial: Vec<TrialEntry<'_>>) -> Option<Resolution> {
    while let Some((i, unmet)) = first_unmet(&trial) {
        let entry = &trial[i];
        if !entry.optional {
            tracing::debug!(module = %entry.element, require = unmet, "unmet require");
            return None;
        }
        tracing::debug!(module = %entry.element, require = unmet, "dropping optional module with unmet require");
        let _ = trial.remove(i);
    }
    if trial.is_empty() {
        return None;
    }
    Some(Resolution {
        group: Group::new(trial.iter().map(|e| e.element.clone().no_opt()).collect()),
        plan: merge(&trial),
    })
}

fn first_unmet<'a>(trial: &[TrialEntry<'a>]) -> Option<(usize, &'a str)> {
    let mut provided: HashSet<&str> = HashSet::new();
    for (i, entry) in trial.iter().enumerate() {
        provided.extend(entry.sections.provides.iter().map(|p| p.name.as_str()));
        if let Some(unmet) = entry
            .sections
            .requires
            .iter()
            .find(|r| !provided.contains(r.name.as_str()))
        {
            return Some((i, unmet.name.as_str()));
        }
    }
    None
}

fn merge(trial: &[TrialEntry<'_>]) -> BuildPlan {
    let mut plan = BuildPlan::default();
    for entry in trial {
        let provider = entry.element.clone().no_opt();
        for provide in &entry.sections.provides {
            let slot = entry_for(&mut plan, &provide.name);
            if !slot.providers.contains(&provider) {
                slot.providers.push(provider.clone());
            }
        }
        for require in &entry.sections.requires {
            let slot = entry_for(&mut plan, &require.name);
            if slot.requires.is_empty() {
                slot.requires.push(require.clone());
            }
        }
    }
    plan
}

fn entry_for<'p>(plan: &'p mut BuildPlan, name: &str) -> &'p mut BuildPlanEntry {
    let index = match plan.entries.iter().position(|e| e.name == name) {
        Some(index) => index,
        None => {
            plan.entries.push(BuildPlanEntry {
                name: name.to_string(),
                ..BuildPlanEntry::default()
            });
            plan.entries.len() - 1
        }
    };
    &mut plan.entries[index]
}

#[cfg(test)]
mod tests {
    use strata_buildpack::Require;

    use super::*;
    use crate::testing::{ids, opt, req};

    fn member(element: GroupElement, alternatives: Vec<PlanSections>) -> Contribution {
        Contribution {
            element,
            alternatives,
        }
    }

    fn one(element: GroupElement, requires: &[&str], provides: &[&str]) -> Contribution {
        member(element, vec![PlanSections::new(requires, provides)])
    }

    #[test]
    fn require_before_provide_is_rejected() {
        let group = [one(req("bp-x"), &["node"], &[]), one(req("bp-y"), &[], &["node"])];
        assert!(resolve(&group).is_none());
    }

    #[test]
    fn provide_before_require_is_accepted() {
        let group = [one(req("bp-y"), &[], &["node"]), one(req("bp-x"), &["node"], &[])];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(ids(&resolution.group), vec!["bp-y", "bp-x"]);
        let entry = resolution.plan.entry("node").expect("entry");
        assert_eq!(entry.providers[0].id, "bp-y");
        assert_eq!(entry.requires[0].name, "node");
    }

    #[test]
    fn self_satisfaction_is_allowed() {
        let group = [one(req("bp"), &["jdk"], &["jdk"])];
        assert!(resolve(&group).is_some());
    }

    #[test]
    fn provide_only_member_yields_plan_entry() {
        let group = [one(req("bp-b"), &[], &["web"])];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(resolution.plan.names(), vec!["web"]);
        assert!(resolution.plan.entries[0].requires.is_empty());
    }

    #[test]
    fn optional_member_with_unmet_require_is_dropped_in_place() {
        let group = [
            one(req("a"), &[], &["x"]),
            one(opt("b"), &["missing"], &["y"]),
            one(req("c"), &["x"], &[]),
            one(opt("d"), &[], &[]),
        ];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(ids(&resolution.group), vec!["a", "c", "d"]);
        assert!(resolution.group.members.iter().all(|m| !m.optional));
    }

    #[test]
    fn dropping_a_provider_cascades() {
        let group = [
            one(opt("a"), &["missing"], &["x"]),
            one(opt("b"), &["x"], &[]),
            one(req("c"), &[], &[]),
        ];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(ids(&resolution.group), vec!["c"]);
    }

    #[test]
    fn empty_result_is_rejected() {
        let group = [one(opt("a"), &["missing"], &[])];
        assert!(resolve(&group).is_none());
        assert!(resolve(&[]).is_none());
    }

    #[test]
    fn repeated_requires_keep_first_metadata() {
        let mut first = Require::named("node");
        let _ = first.metadata.insert("version".into(), toml::Value::from("20"));
        let mut second = Require::named("node");
        let _ = second.metadata.insert("version".into(), toml::Value::from("18"));
        let group = [
            one(req("p"), &[], &["node"]),
            member(req("a"), vec![PlanSections { requires: vec![first.clone()], provides: vec![] }]),
            member(req("b"), vec![PlanSections { requires: vec![second], provides: vec![] }]),
        ];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(resolution.plan.entries.len(), 1);
        assert_eq!(resolution.plan.entries[0].requires, vec![first]);
    }

    #[test]
    fn alternatives_are_tried_first_member_slowest() {
        let group = [
            member(
                req("a"),
                vec![PlanSections::new(&[], &["x"]), PlanSections::new(&[], &["y"])],
            ),
            member(
                req("b"),
                vec![PlanSections::new(&["y"], &[]), PlanSections::new(&["x"], &["z"])],
            ),
        ];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(resolution.plan.names(), vec!["x", "z"]);
    }

    #[test]
    fn optional_only_on_last_alternative() {
        // b's first alternative is unsatisfiable and must not drop b.
        let group = [
            one(req("a"), &[], &["x"]),
            member(
                opt("b"),
                vec![PlanSections::new(&["missing"], &[]), PlanSections::new(&["x"], &[])],
            ),
        ];
        let resolution = resolve(&group).expect("resolved");
        assert_eq!(ids(&resolution.group), vec!["a", "b"]);
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let group = [
            one(req("a"), &[], &["x", "y"]),
            one(req("b"), &["x"], &["z"]),
            one(req("c"), &["z", "y"], &[]),
        ];
        let first = resolve(&group).expect("resolved");
        let replay: Vec<Contribution> = first
            .group
            .members
            .iter()
            .zip(&group)
            .map(|(element, c)| member(element.clone(), c.alternatives.clone()))
            .collect();
        assert_eq!(resolve(&replay).expect("resolved"), first);
    }
}
