/// Player actions: narrative continues and option choices.

use rand::Rng;

use crate::core::delta::apply_delta;
use crate::core::probability::apply_probability;
use crate::core::router::{auto_advance, RoutingError};
use crate::schema::catalog::{Catalog, Choice, Node};
use crate::schema::state::{GameState, HistoryEntry};

/// Apply one player action and return the resulting state.
///
/// `choice` is the selected option for a decision node and `None` for a
/// narrative "continue". The input state is never modified. Invalid
/// actions (no option on a decision, a gated option, an unknown node)
/// return an unchanged copy.
///
/// Order of handling:
/// 1. A pending feedback queue is drained first, one stop per action.
/// 2. Narrative nodes advance to their authored successor. A feedback stop
///    with no successor resumes at the multi-router's return node.
/// 3. Decision nodes apply the option's effects and follow `next`.
pub fn apply_option<R: Rng>(
    state: &GameState,
    choice: Option<&Choice>,
    catalog: &Catalog,
    max_hops: usize,
    rng: &mut R,
) -> Result<GameState, RoutingError> {
    let mut next = state.clone();

    let Some(node) = catalog.node(&next.node) else {
        log::warn!("action on unknown node '{}'", next.node);
        return Ok(next);
    };

    if let Some(stop) = next.feedback_queue.pop_front() {
        if !stop.is_empty() {
            log::debug!("feedback '{}' -> '{}'", next.node, stop);
            next.node = stop;
            return Ok(next);
        }
        return match next.router_return_node.take() {
            Some(resume) => {
                next.feedback_queue.clear();
                next.node = resume;
                auto_advance(&mut next, catalog, max_hops)?;
                Ok(next)
            }
            None => Ok(state.clone()),
        };
    }

    match node {
        Node::Narrative(narrative) => {
            let target = match narrative.successor(&next.location) {
                Some(target) => target.to_string(),
                None => match next.router_return_node.take() {
                    Some(resume) => resume,
                    None => {
                        log::warn!(
                            "narrative '{}' has no successor for location '{}'",
                            next.node,
                            next.location
                        );
                        return Ok(next);
                    }
                },
            };
            next.history.push(HistoryEntry {
                node: next.node.clone(),
                choice: None,
            });
            next.node = target;
            auto_advance(&mut next, catalog, max_hops)?;
            Ok(next)
        }
        Node::Decision(_) => {
            let Some(choice) = choice else {
                return Ok(next);
            };
            if !choice.is_available(&next) {
                log::debug!("option '{}' rejected at '{}'", choice.id, next.node);
                return Ok(next);
            }

            let bounds = catalog.bounds();
            next.history.push(HistoryEntry {
                node: next.node.clone(),
                choice: Some(choice.id.clone()),
            });
            apply_delta(&mut next, &choice.delta, bounds);

            let persona_override = choice.persona_override(&next.persona);
            if let Some(delta) = persona_override.and_then(|o| o.delta.as_ref()) {
                apply_delta(&mut next, delta, bounds);
            }
            let table = persona_override
                .and_then(|o| o.probability.as_deref())
                .unwrap_or(choice.probability.as_slice());
            apply_probability(&mut next, table, bounds, rng);

            for flag in choice.flags() {
                next.add_flag(flag);
            }

            log::debug!("option '{}' at '{}' -> '{}'", choice.id, next.node, choice.next);
            next.router_return_node = None;
            next.node = choice.next.clone();
            auto_advance(&mut next, catalog, max_hops)?;
            Ok(next)
        }
        Node::Router(_) | Node::RouterMulti(_) | Node::Outcome(_) => Ok(next),
    }
}
