/// Offline catalog checks for content that would misbehave at runtime.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::core::condition::Expr;
use crate::schema::catalog::{Catalog, Delta, Node};
use crate::schema::stat::Stat;

/// Findings from [`lint_catalog`]. Errors make content unplayable on some
/// path; warnings are worth a look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Run every check against a catalog, starting from `start_node`.
pub fn lint_catalog(catalog: &Catalog, start_node: &str) -> LintReport {
    let mut report = LintReport::default();

    if catalog.node(start_node).is_none() {
        report
            .errors
            .push(format!("Start node '{}' does not exist", start_node));
    }

    // Sorted so reports are stable between runs
    let mut ids: Vec<&String> = catalog.nodes.keys().collect();
    ids.sort();

    for id in &ids {
        let node = &catalog.nodes[id.as_str()];
        check_references(id, node, catalog, &mut report);
        check_node_conditions(id, node, &mut report);
        check_node_shape(id, node, catalog, &mut report);
    }

    for (i, rule) in catalog.outcomes.iter().enumerate() {
        check_condition(&format!("Outcome rule {} ('{}')", i, rule.result), &rule.condition, &mut report);
    }
    if catalog.outcomes.is_empty() && catalog.nodes.values().any(|n| matches!(n, Node::Outcome(_))) {
        report
            .warnings
            .push("Outcome nodes exist but no outcome rules are authored".to_string());
    }

    for rule in &catalog.literacy_scoring.rules {
        let context = format!("Literacy rule '{}'", rule.id);
        if let Some(ref expr) = rule.condition {
            check_condition(&context, expr, &mut report);
        } else if let Some(ref expr) = rule.if_expr {
            check_condition(&context, expr, &mut report);
        } else if rule.if_flag.is_none() && rule.if_any_flag.is_none() {
            report
                .warnings
                .push(format!("{} has no matcher and can never score", context));
        }
    }

    for (id, profile) in &catalog.personas {
        check_delta(&format!("Persona '{}'", id), &profile.delta, &mut report);
    }
    for (id, profile) in &catalog.locations {
        check_delta(&format!("Location '{}'", id), &profile.delta, &mut report);
    }

    for cycle in router_cycles(catalog) {
        report.errors.push(format!(
            "Router cycle with no interactive node: {}",
            cycle.join(" -> ")
        ));
    }

    if catalog.node(start_node).is_some() {
        let reachable = reachable_from(catalog, start_node);
        for id in &ids {
            if !reachable.contains(id.as_str()) {
                report
                    .warnings
                    .push(format!("Node '{}' is unreachable from '{}'", id, start_node));
            }
        }
    }

    report
}

fn check_references(id: &str, node: &Node, catalog: &Catalog, report: &mut LintReport) {
    for target in node.successors() {
        if target.is_empty() {
            report
                .errors
                .push(format!("Node '{}' has an empty successor id", id));
        } else if catalog.node(target).is_none() {
            report.errors.push(format!(
                "Node '{}' references non-existent node '{}'",
                id, target
            ));
        }
    }
}

fn check_node_conditions(id: &str, node: &Node, report: &mut LintReport) {
    match node {
        Node::Router(router) => {
            for branch in &router.conditions {
                match branch.condition {
                    Some(ref expr) => check_condition(&format!("Router '{}'", id), expr, report),
                    None => report.warnings.push(format!(
                        "Router '{}' has a branch to '{}' with no condition",
                        id, branch.next
                    )),
                }
                check_delta(&format!("Router '{}'", id), &branch.apply_delta, report);
            }
        }
        Node::RouterMulti(router) => {
            for branch in &router.conditions {
                match branch.condition {
                    Some(ref expr) => check_condition(&format!("Multi-router '{}'", id), expr, report),
                    None => report.warnings.push(format!(
                        "Multi-router '{}' has a branch to '{}' with no condition",
                        id, branch.next
                    )),
                }
            }
        }
        Node::Decision(decision) => {
            for option in &decision.options {
                let context = format!("Option '{}' on '{}'", option.id, id);
                check_delta(&context, &option.delta, report);
                for key in option.requires_value.keys() {
                    if Stat::from_key(key).is_none() {
                        report
                            .warnings
                            .push(format!("{} gates on unknown stat '{}'", context, key));
                    }
                }
                let mut tables = vec![option.probability.as_slice()];
                for (persona, o) in &option.persona_overrides {
                    let override_context = format!("{} (persona '{}')", context, persona);
                    if let Some(ref delta) = o.delta {
                        check_delta(&override_context, delta, report);
                    }
                    if let Some(ref table) = o.probability {
                        tables.push(table.as_slice());
                    }
                }
                for entry in tables.into_iter().flatten() {
                    if let Some(ref expr) = entry.condition {
                        check_condition(&context, expr, report);
                    }
                    check_delta(&context, &entry.effect, report);
                }
            }
        }
        Node::Narrative(_) | Node::Outcome(_) => {}
    }
}

fn check_node_shape(id: &str, node: &Node, catalog: &Catalog, report: &mut LintReport) {
    match node {
        Node::Narrative(narrative) => {
            if narrative.next.is_none() {
                let missing: Vec<&String> = catalog
                    .locations
                    .keys()
                    .filter(|loc| narrative.successor(loc).is_none())
                    .collect();
                if !missing.is_empty() {
                    report.warnings.push(format!(
                        "Narrative '{}' has no successor for location(s) {:?}",
                        id, missing
                    ));
                }
            }
        }
        Node::Decision(decision) => {
            if decision.options.is_empty() {
                report
                    .warnings
                    .push(format!("Decision '{}' has no options", id));
            }
        }
        Node::Router(router) => {
            if router.default_next.is_none() {
                report
                    .warnings
                    .push(format!("Router '{}' has no default_next", id));
            }
        }
        Node::RouterMulti(router) => {
            for branch in &router.conditions {
                if matches!(catalog.node(&branch.next), Some(n) if !n.is_interactive()) {
                    report.warnings.push(format!(
                        "Multi-router '{}' sends feedback to non-interactive node '{}'",
                        id, branch.next
                    ));
                }
            }
        }
        Node::Outcome(_) => {}
    }
}

fn check_condition(context: &str, expr: &str, report: &mut LintReport) {
    if let Err(e) = Expr::parse(expr) {
        report
            .errors
            .push(format!("{} has invalid condition `{}`: {}", context, expr, e));
    }
}

fn check_delta(context: &str, delta: &Delta, report: &mut LintReport) {
    for key in delta.unknown_keys() {
        report
            .warnings
            .push(format!("{} adjusts unknown stat '{}'", context, key));
    }
}

/// Edges the auto-advance loop follows without player input.
fn auto_edges<'a>(node: &'a Node) -> Vec<&'a str> {
    match node {
        Node::Router(router) => {
            let mut out: Vec<&str> = router.conditions.iter().map(|b| b.next.as_str()).collect();
            out.extend(router.default_next.as_deref());
            out
        }
        // Matched branches stop the loop; only the continuation is followed.
        Node::RouterMulti(router) => vec![router.next_after_feedback.as_str()],
        _ => Vec::new(),
    }
}

/// Cycles consisting only of router and multi-router nodes.
///
/// Each cycle is reported once, starting from its smallest node id.
pub fn router_cycles(catalog: &Catalog) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut routers: Vec<&str> = catalog
        .nodes
        .iter()
        .filter(|(_, n)| matches!(n, Node::Router(_) | Node::RouterMulti(_)))
        .map(|(id, _)| id.as_str())
        .collect();
    routers.sort();

    let mut marks: HashMap<&str, Mark> = routers.iter().map(|id| (*id, Mark::Unvisited)).collect();
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut cycles = Vec::new();

    fn visit<'a>(
        id: &'a str,
        catalog: &'a Catalog,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        seen: &mut BTreeSet<Vec<String>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        marks.insert(id, Mark::InProgress);
        path.push(id);
        if let Some(node) = catalog.node(id) {
            for next in auto_edges(node) {
                match marks.get(next).copied() {
                    Some(Mark::Unvisited) => visit(next, catalog, marks, path, seen, cycles),
                    Some(Mark::InProgress) => {
                        if let Some(pos) = path.iter().position(|p| *p == next) {
                            let mut cycle: Vec<String> =
                                path[pos..].iter().map(|s| s.to_string()).collect();
                            if let Some(min_pos) = cycle
                                .iter()
                                .enumerate()
                                .min_by(|a, b| a.1.cmp(b.1))
                                .map(|(i, _)| i)
                            {
                                cycle.rotate_left(min_pos);
                            }
                            if seen.insert(cycle.clone()) {
                                let mut closed = cycle;
                                closed.push(closed[0].clone());
                                cycles.push(closed);
                            }
                        }
                    }
                    // Done, or not a router at all
                    _ => {}
                }
            }
        }
        path.pop();
        marks.insert(id, Mark::Done);
    }

    for id in routers {
        if marks.get(id) == Some(&Mark::Unvisited) {
            let mut path = Vec::new();
            visit(id, catalog, &mut marks, &mut path, &mut seen, &mut cycles);
        }
    }

    cycles
}

fn reachable_from<'a>(catalog: &'a Catalog, start: &'a str) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        let Some((key, node)) = catalog.nodes.get_key_value(id) else {
            continue;
        };
        if !seen.insert(key.as_str()) {
            continue;
        }
        queue.extend(node.successors());
    }
    seen
}
