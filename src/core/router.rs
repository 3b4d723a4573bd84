/// Auto-advance: walks non-interactive nodes until the player is needed.

use std::collections::VecDeque;
use thiserror::Error;

use crate::core::condition;
use crate::core::delta::apply_delta;
use crate::core::scoring;
use crate::schema::catalog::{Catalog, Node, RouterBranch};
use crate::schema::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("routing from '{start}' did not terminate after {hops} hops (last node '{last}')")]
    DidNotTerminate {
        start: String,
        last: String,
        hops: usize,
    },
}

/// Where an auto-advance run came to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStop {
    /// A narrative or decision node.
    Interactive,
    /// A multi-router fired; `node` is the first of its matches.
    Feedback,
    /// An outcome node; the state has been scored.
    Outcome,
    /// `node` is not in the catalog.
    MissingNode,
    /// A router matched nothing and has no default.
    Stalled,
}

fn matches(branch: &RouterBranch, state: &GameState) -> bool {
    branch
        .condition
        .as_deref()
        .map_or(false, |expr| condition::evaluate(expr, state))
}

/// Advance `state.node` through routers until it rests.
///
/// Each router or multi-router visited counts as one hop; more than
/// `max_hops` in one run is reported as [`RoutingError::DidNotTerminate`].
pub fn auto_advance(
    state: &mut GameState,
    catalog: &Catalog,
    max_hops: usize,
) -> Result<RouteStop, RoutingError> {
    let start = state.node.clone();
    let mut hops = 0usize;

    loop {
        let Some(node) = catalog.node(&state.node) else {
            log::warn!("node '{}' not found in catalog", state.node);
            return Ok(RouteStop::MissingNode);
        };

        match node {
            Node::Narrative(_) | Node::Decision(_) => return Ok(RouteStop::Interactive),
            Node::Outcome(_) => {
                scoring::score(state, catalog);
                return Ok(RouteStop::Outcome);
            }
            Node::Router(_) | Node::RouterMulti(_) if hops >= max_hops => {
                return Err(RoutingError::DidNotTerminate {
                    start,
                    last: state.node.clone(),
                    hops,
                });
            }
            Node::Router(router) => {
                hops += 1;
                match router.conditions.iter().find(|b| matches(b, state)) {
                    Some(branch) => {
                        apply_delta(state, &branch.apply_delta, catalog.bounds());
                        log::debug!("router '{}' -> '{}'", state.node, branch.next);
                        state.node = branch.next.clone();
                    }
                    None => match router.default_next {
                        Some(ref fallback) => {
                            log::debug!("router '{}' -> '{}' (default)", state.node, fallback);
                            state.node = fallback.clone();
                        }
                        None => {
                            log::warn!("router '{}' matched nothing and has no default", state.node);
                            return Ok(RouteStop::Stalled);
                        }
                    },
                }
            }
            Node::RouterMulti(router) => {
                hops += 1;
                if state.router_marks.contains(&state.node) {
                    log::debug!("multi-router '{}' already fired", state.node);
                    // The excursion came back through its router
                    state.router_return_node = None;
                    state.node = router.next_after_feedback.clone();
                    continue;
                }

                let mut targets: VecDeque<String> = router
                    .conditions
                    .iter()
                    .filter(|b| matches(b, state))
                    .map(|b| b.next.clone())
                    .collect();

                let Some(first) = targets.pop_front() else {
                    state.node = router.next_after_feedback.clone();
                    continue;
                };

                log::debug!(
                    "multi-router '{}' -> '{}' with {} queued",
                    state.node,
                    first,
                    targets.len()
                );
                state.router_marks.insert(state.node.clone());
                state.feedback_queue = targets;
                state.router_return_node = Some(router.next_after_feedback.clone());
                state.node = first;
                return Ok(RouteStop::Feedback);
            }
        }
    }
}
