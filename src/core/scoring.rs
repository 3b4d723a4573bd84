/// Outcome selection and literacy rubric scoring.

use crate::core::condition;
use crate::schema::catalog::{Catalog, LiteracyRule, LiteracyScoring, OutcomeRule};
use crate::schema::state::{GameState, LiteracyDetail, LiteracyScore};

/// The winning outcome rule: lowest priority first, authored order breaks
/// ties, first rule whose condition holds.
pub fn select_outcome<'a>(rules: &'a [OutcomeRule], state: &GameState) -> Option<&'a OutcomeRule> {
    let mut sorted: Vec<&OutcomeRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.priority);
    sorted
        .into_iter()
        .find(|r| condition::evaluate(&r.condition, state))
}

/// Whether a rubric rule matches, using its first authored matcher.
pub fn rule_matches(rule: &LiteracyRule, state: &GameState) -> bool {
    if let Some(ref expr) = rule.condition {
        condition::evaluate(expr, state)
    } else if let Some(ref expr) = rule.if_expr {
        condition::evaluate(expr, state)
    } else if let Some(ref flag) = rule.if_flag {
        state.has_flag(flag)
    } else if let Some(ref flags) = rule.if_any_flag {
        flags.iter().any(|f| state.has_flag(f))
    } else {
        false
    }
}

/// Sum the scores of every matching rule, in authored order.
pub fn score_literacy(scoring: &LiteracyScoring, state: &GameState) -> LiteracyScore {
    let mut result = LiteracyScore {
        score: 0,
        max_score: scoring.max_score,
        details: Vec::new(),
    };
    for rule in scoring.rules.iter().filter(|r| rule_matches(r, state)) {
        result.score += rule.score;
        result.details.push(LiteracyDetail {
            id: rule.id.clone(),
            dimension: rule.dimension.clone(),
            explanation: rule.explain_success.clone(),
        });
    }
    result
}

/// Fill in the outcome and rubric on a state that just reached an outcome
/// node. A state is scored at most once.
pub fn score(state: &mut GameState, catalog: &Catalog) {
    if state.is_finished() {
        log::debug!("state at '{}' already scored", state.node);
        return;
    }

    match select_outcome(&catalog.outcomes, state) {
        Some(rule) => {
            state.outcome = Some(rule.result.clone());
            state.outcome_description = Some(rule.description.clone().unwrap_or_default());
        }
        None => log::warn!("no outcome rule matched at node '{}'", state.node),
    }

    let literacy = score_literacy(&catalog.literacy_scoring, state);
    log::info!(
        "outcome {:?} reached at '{}', literacy {}/{}",
        state.outcome,
        state.node,
        literacy.score,
        literacy.max_score
    );
    state.literacy = Some(literacy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::stat::{Stat, Stats};

    fn make_state() -> GameState {
        let mut stats = Stats::default();
        stats.set(Stat::S, 6);
        stats.set(Stat::HR, 1);
        let mut state = GameState::new("END", "Student", "Hill", stats);
        state.add_flag("B");
        state.add_flag("EVACUATED");
        state
    }

    fn outcome(condition: &str, priority: i32, result: &str) -> OutcomeRule {
        OutcomeRule {
            condition: condition.to_string(),
            priority,
            result: result.to_string(),
            description: Some(format!("{} description", result)),
        }
    }

    fn rule(id: &str, score: i32) -> LiteracyRule {
        LiteracyRule {
            id: id.to_string(),
            dimension: Some("Preparedness".to_string()),
            score,
            condition: None,
            if_expr: None,
            if_flag: None,
            if_any_flag: None,
            explain_success: Some(format!("{} explained", id)),
        }
    }

    #[test]
    fn lowest_priority_wins_when_both_match() {
        let state = make_state();
        let rules = vec![outcome("S > 0", 2, "Second"), outcome("S > 0", 1, "First")];
        assert_eq!(select_outcome(&rules, &state).unwrap().result, "First");
    }

    #[test]
    fn equal_priorities_keep_authored_order() {
        let state = make_state();
        let rules = vec![outcome("true", 1, "A"), outcome("true", 1, "B")];
        assert_eq!(select_outcome(&rules, &state).unwrap().result, "A");
    }

    #[test]
    fn skips_false_and_broken_rules() {
        let state = make_state();
        let rules = vec![
            outcome("S > 100", 0, "Never"),
            outcome("S >", 1, "Broken"),
            outcome("flags.includes('EVACUATED')", 5, "Evacuated"),
        ];
        assert_eq!(select_outcome(&rules, &state).unwrap().result, "Evacuated");
        assert!(select_outcome(&rules[..2], &state).is_none());
    }

    #[test]
    fn any_flag_matches_once() {
        let state = make_state();
        let mut r = rule("L1", 3);
        r.if_any_flag = Some(vec!["A".to_string(), "B".to_string()]);
        let scoring = LiteracyScoring {
            rules: vec![r],
            max_score: 10,
        };
        let result = score_literacy(&scoring, &state);
        assert_eq!(result.score, 3);
        assert_eq!(result.details.len(), 1);
        assert_eq!(result.max_score, 10);
    }

    #[test]
    fn matcher_precedence() {
        let state = make_state();

        // `condition` decides even though `if_flag` would match
        let mut r = rule("C", 1);
        r.condition = Some("S > 100".to_string());
        r.if_flag = Some("B".to_string());
        assert!(!rule_matches(&r, &state));

        let mut r = rule("I", 1);
        r.if_expr = Some("HR == 1".to_string());
        r.if_flag = Some("MISSING".to_string());
        assert!(rule_matches(&r, &state));

        let mut r = rule("F", 1);
        r.if_flag = Some("EVACUATED".to_string());
        assert!(rule_matches(&r, &state));

        assert!(!rule_matches(&rule("EMPTY", 1), &state));
    }

    #[test]
    fn details_follow_authored_order() {
        let state = make_state();
        let mut a = rule("A", 2);
        a.if_flag = Some("EVACUATED".to_string());
        let mut b = rule("B", 5);
        b.if_flag = Some("NOT_SET".to_string());
        let mut c = rule("C", 4);
        c.condition = Some("location == 'Hill'".to_string());
        let scoring = LiteracyScoring {
            rules: vec![a, b, c],
            max_score: 11,
        };
        let result = score_literacy(&scoring, &state);
        assert_eq!(result.score, 6);
        let ids: Vec<&str> = result.details.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(result.details[1].explanation.as_deref(), Some("C explained"));
    }
}
