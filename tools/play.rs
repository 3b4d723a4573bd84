/// Play — interactive terminal shell for walking through a story catalog.
///
/// Usage: play --catalog <path> [--config <path>] [--seed <n>]
///
/// Commands:
///   continue (or c)          — advance a narrative node
///   choose <option_id|n>     — pick an option on a decision node
///   stats                    — show every stat with its bounds
///   flags                    — show collected flags
///   restart                  — start a brand new game
///   start <persona> <loc>    — start with an explicit persona and location
///   seed <n>                 — set RNG seed
///   help                     — list commands
///   quit                     — exit

use narrative_interpreter::core::view::{stat_readings, NodeView};
use narrative_interpreter::{Engine, GameState};
use std::io::{self, BufRead, Write};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut config_path = None;
    let mut seed = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse::<u64>().ok();
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        eprintln!("ERROR: --catalog is required");
        print_usage();
        std::process::exit(1);
    };

    let mut builder = Engine::builder().catalog_path(catalog_path);
    if let Some(path) = config_path {
        builder = builder.config_path(path);
    }
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let report = engine.lint();
    if !report.errors.is_empty() {
        println!("Catalog has {} lint errors; run content_linter for details.", report.errors.len());
    }

    let mut state = match engine.new_game() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("Loaded {} nodes", engine.catalog().nodes.len());
    match engine.config().seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!("Type 'help' for commands.\n");
    show(&engine, &state);

    let stdin = io::stdin();
    loop {
        print!("play> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(cmd) = parts.first() else {
            continue;
        };

        let next = match *cmd {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" => {
                print_help();
                continue;
            }
            "continue" | "c" => engine.apply_option(&state, None),
            "choose" => {
                let Some(arg) = parts.get(1) else {
                    println!("Usage: choose <option_id|n>");
                    continue;
                };
                let option_id = resolve_option(&engine, &state, arg);
                engine.apply_option(&state, Some(option_id.as_str()))
            }
            "stats" => {
                for r in stat_readings(&state, engine.catalog()) {
                    println!("  {:<3} {:<22} {:>3}  [{}..{}]", r.stat, r.label, r.value, r.min, r.max);
                }
                continue;
            }
            "flags" => {
                let mut flags: Vec<&String> = state.flags.iter().collect();
                flags.sort();
                println!("  {:?}", flags);
                continue;
            }
            "restart" => engine.new_game(),
            "start" if parts.len() == 3 => engine.new_game_with(parts[1], parts[2]),
            "start" => {
                println!("Usage: start <persona> <location>");
                println!("  personas: {:?}", engine.catalog().personas.keys().collect::<Vec<_>>());
                println!("  locations: {:?}", engine.catalog().locations.keys().collect::<Vec<_>>());
                continue;
            }
            "seed" => {
                match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                    Some(seed) => {
                        engine.reseed(seed);
                        println!("Seed set to {}", seed);
                    }
                    None => println!("Usage: seed <n>"),
                }
                continue;
            }
            other => {
                println!("Unknown command: {}. Type 'help'.", other);
                continue;
            }
        };

        match next {
            Ok(s) => {
                if s == state {
                    println!("(nothing happened)");
                }
                state = s;
                show(&engine, &state);
            }
            Err(e) => println!("ERROR: {}", e),
        }
    }
}

/// Accept either an option id or its 1-based position.
fn resolve_option(engine: &Engine, state: &GameState, arg: &str) -> String {
    if let (Ok(n), NodeView::Decision { options, .. }) = (arg.parse::<usize>(), engine.view(state)) {
        if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
            return option.id.clone();
        }
    }
    arg.to_string()
}

fn show(engine: &Engine, state: &GameState) {
    let feedback = if state.in_feedback() { " | feedback" } else { "" };
    println!(
        "\n[{} | {} | {}{}]",
        state.node, state.persona, state.location, feedback
    );
    match engine.view(state) {
        NodeView::Narrative { text, .. } => {
            println!("{}", text);
            println!("  (continue)");
        }
        NodeView::Decision { text, options, .. } => {
            println!("{}", text);
            for (i, option) in options.iter().enumerate() {
                let lock = if option.locked { " [locked]" } else { "" };
                println!("  {}. {} ({}){}", i + 1, option.label, option.id, lock);
            }
        }
        NodeView::Outcome {
            text,
            outcome,
            description,
            literacy,
            skill,
            ..
        } => {
            println!("{}", text);
            println!("\n--- Outcome: {} ---", outcome.as_deref().unwrap_or("none"));
            if let Some(description) = description {
                println!("{}", description);
            }
            if let Some(score) = literacy {
                println!("Literacy: {}/{}", score.score, score.max_score);
                for detail in &score.details {
                    println!(
                        "  + {} {}",
                        detail.dimension.as_deref().unwrap_or(&detail.id),
                        detail.explanation.as_deref().unwrap_or("")
                    );
                }
            }
            if let Some(skill) = skill {
                println!("{}: {}/{}", skill.label, skill.value, skill.max);
            }
            println!("  (restart to play again)");
        }
        NodeView::Stalled { node } => println!("Router '{}' could not route. Try 'restart'.", node),
        NodeView::Missing { node } => println!("Node '{}' is missing from the catalog.", node),
    }
    println!();
}

fn print_usage() {
    println!("Usage: play --catalog <path> [--config <path>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  continue (or c)          advance a narrative node");
    println!("  choose <option_id|n>     pick an option on a decision node");
    println!("  stats                    show every stat with its bounds");
    println!("  flags                    show collected flags");
    println!("  restart                  start a brand new game");
    println!("  start <persona> <loc>    start with an explicit persona and location");
    println!("  seed <n>                 set RNG seed");
    println!("  help                     list commands");
    println!("  quit                     exit");
}
