/// Interpreter integration tests — full playthroughs of a fixture story.

use narrative_interpreter::core::engine::{Engine, EngineError};
use narrative_interpreter::core::router::{auto_advance, RouteStop, RoutingError};
use narrative_interpreter::core::view::NodeView;
use narrative_interpreter::schema::catalog::Catalog;
use narrative_interpreter::schema::stat::Stat;
use narrative_interpreter::schema::state::{GameState, HistoryEntry};
use std::collections::VecDeque;
use std::path::Path;

fn load_story() -> Catalog {
    Catalog::load(Path::new("tests/fixtures/flood_story.json")).unwrap()
}

fn engine(seed: u64) -> Engine {
    Engine::builder()
        .catalog(load_story())
        .seed(seed)
        .build()
        .unwrap()
}

fn act(engine: &mut Engine, state: &GameState, option: Option<&str>) -> GameState {
    engine.apply_option(state, option).unwrap()
}

#[test]
fn prepared_evacuation_playthrough() {
    let mut e = engine(42);
    let state = e.new_game_with("Student", "Coastal").unwrap();
    assert_eq!(state.node, "COAST_INTRO");
    assert_eq!(state.value(Stat::SC), 3);
    assert_eq!(state.value(Stat::SA), 1);
    assert!(matches!(
        e.view(&state),
        NodeView::Narrative { ref text, .. } if text == "Waves slap the sea wall. Safety 3."
    ));

    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "PREP");

    let state = act(&mut e, &state, Some("kit"));
    assert_eq!(state.node, "WARNING");
    assert_eq!((state.value(Stat::S), state.value(Stat::R)), (4, 3));
    assert!(state.has_flag("KIT"));

    // Evacuating fans out into three feedback stops
    let state = act(&mut e, &state, Some("evacuate"));
    assert_eq!(state.node, "FB_KIT");
    assert_eq!(
        state.feedback_queue,
        VecDeque::from(["FB_EVAC".to_string(), "FB_SAFE".to_string()])
    );
    assert_eq!(state.router_return_node.as_deref(), Some("ENDING_ROUTER"));
    assert!(state.router_marks.contains("FEEDBACK"));
    assert!(!state.has_flag("FEEDBACK"));

    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "FB_EVAC");
    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "FB_SAFE");
    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "END");
    assert!(state.router_return_node.is_none());
    assert!(state.feedback_queue.is_empty());

    assert_eq!(state.outcome.as_deref(), Some("Safe"));
    assert_eq!(
        state.outcome_description.as_deref(),
        Some("You got out in time and well prepared.")
    );
    let literacy = state.literacy.as_ref().unwrap();
    assert_eq!((literacy.score, literacy.max_score), (6, 6));
    let ids: Vec<&str> = literacy.details.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["L1", "L2", "L3"]);
    assert_eq!(
        literacy.details[1].explanation.as_deref(),
        Some("You acted on the official warning.")
    );

    assert_eq!(
        state.history,
        vec![
            HistoryEntry { node: "COAST_INTRO".to_string(), choice: None },
            HistoryEntry { node: "PREP".to_string(), choice: Some("kit".to_string()) },
            HistoryEntry { node: "WARNING".to_string(), choice: Some("evacuate".to_string()) },
            HistoryEntry { node: "FB_SAFE".to_string(), choice: None },
        ]
    );
}

#[test]
fn careless_stay_clamps_and_strands() {
    let mut e = engine(1);
    let state = e.new_game_with("Parent", "River").unwrap();
    assert_eq!(state.node, "INLAND_INTRO");
    assert_eq!(state.value(Stat::FM), 1);

    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, Some("nothing"));
    // 3 - 5 clamps at the floor
    assert_eq!(state.value(Stat::S), 0);

    let state = act(&mut e, &state, Some("stay"));
    assert_eq!(state.node, "FB_RISK");
    assert!(state.feedback_queue.is_empty());
    assert!(state.in_feedback());
    assert_eq!(state.value(Stat::HR), 3);

    // The stop's own chain runs before the story moves on
    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "FB_RISK_RECAP");
    assert_eq!(state.router_return_node.as_deref(), Some("ENDING_ROUTER"));

    // Back through FEEDBACK, which has already fired
    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "END");
    assert!(!state.in_feedback());
    assert_eq!(state.feedback_queue.len(), 0);
    let visited: Vec<&str> = state.history.iter().map(|h| h.node.as_str()).collect();
    assert_eq!(visited, vec!["INLAND_INTRO", "PREP", "WARNING", "FB_RISK", "FB_RISK_RECAP"]);
    assert_eq!(state.outcome.as_deref(), Some("Stranded"));
    assert_eq!(state.literacy.as_ref().map(|l| l.score), Some(0));
}

#[test]
fn hill_players_get_their_own_route_and_ending_text() {
    let mut e = engine(5);
    let state = e.new_game_with("Student", "Hill").unwrap();
    let state = act(&mut e, &state, None);
    assert_eq!(state.node, "HILL_INTRO");

    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, Some("nothing"));
    let state = act(&mut e, &state, Some("stay"));
    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, None);

    let NodeView::Outcome { text, skill, outcome, .. } = e.view(&state) else {
        panic!("expected outcome view");
    };
    assert_eq!(text, "From the hilltop you watch the water recede.");
    assert_eq!(outcome.as_deref(), Some("Stranded"));
    let skill = skill.unwrap();
    assert_eq!((skill.stat, skill.value), (Stat::LA, 1));
}

#[test]
fn elder_override_adds_to_option_effects() {
    let mut e = engine(9);
    let state = e.new_game_with("Elder", "Coastal").unwrap();
    assert!(matches!(
        e.view(&state),
        NodeView::Narrative { ref text, .. } if text == "You have seen this tide before."
    ));
    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, Some("kit"));
    let state = act(&mut e, &state, Some("evacuate"));

    // Override HR +1, then the option table adds HR +1 or M -1
    let hr = state.value(Stat::HR);
    let m = state.value(Stat::M);
    assert!((hr, m) == (2, 4) || (hr, m) == (1, 3), "got HR {} M {}", hr, m);
}

#[test]
fn locked_option_is_shown_and_rejected() {
    let mut e = engine(2);
    let state = e.new_game_with("Parent", "River").unwrap();
    let state = act(&mut e, &state, None);

    let NodeView::Decision { options, .. } = e.view(&state) else {
        panic!("expected decision view");
    };
    let radio = options.iter().find(|o| o.id == "radio").unwrap();
    assert!(radio.locked);

    assert_eq!(act(&mut e, &state, Some("radio")), state);
    assert_eq!(act(&mut e, &state, None), state, "decision needs an option");
}

#[test]
fn multi_router_fires_once() {
    let mut e = engine(42);
    let state = e.new_game_with("Student", "Coastal").unwrap();
    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, Some("kit"));
    let mut state = act(&mut e, &state, Some("evacuate"));
    assert!(state.router_marks.contains("FEEDBACK"));

    state.feedback_queue.clear();
    state.router_return_node = None;
    state.node = "FEEDBACK".to_string();
    assert_eq!(auto_advance(&mut state, e.catalog(), 64), Ok(RouteStop::Outcome));
    assert_eq!(state.node, "END");
    assert!(state.feedback_queue.is_empty());
}

#[test]
fn routing_guard_reports_cycle() {
    let mut e = Engine::builder()
        .catalog_path("tests/fixtures/router_cycle.json")
        .max_auto_advance(10)
        .seed(0)
        .build()
        .unwrap();
    let err = e.new_game_with("Student", "River").unwrap_err();
    assert!(matches!(
        err,
        EngineError::Routing(RoutingError::DidNotTerminate { ref start, hops: 10, .. })
            if start == "DAY0_LOCATION"
    ));
}

/// Always take the first unlocked option, continue otherwise.
fn autoplay(e: &mut Engine) -> GameState {
    let mut state = e.new_game().unwrap();
    for _ in 0..20 {
        let option = match e.view(&state) {
            NodeView::Decision { options, .. } => {
                options.into_iter().find(|o| !o.locked).map(|o| o.id)
            }
            NodeView::Narrative { .. } => None,
            _ => break,
        };
        state = e.apply_option(&state, option.as_deref()).unwrap();
    }
    state
}

#[test]
fn same_seed_same_playthrough() {
    let first = autoplay(&mut engine(1234));
    let second = autoplay(&mut engine(1234));
    assert_eq!(first, second);
    assert!(first.is_finished());
}

#[test]
fn state_survives_json_round_trip_mid_feedback() {
    let mut e = engine(42);
    let state = e.new_game_with("Student", "Coastal").unwrap();
    let state = act(&mut e, &state, None);
    let state = act(&mut e, &state, Some("kit"));
    let state = act(&mut e, &state, Some("evacuate"));

    let json = serde_json::to_string(&state).unwrap();
    let restored: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
    assert_eq!(act(&mut e, &restored, None).node, "FB_EVAC");
}
