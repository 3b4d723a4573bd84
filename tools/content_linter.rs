/// Content Linter — validates a story catalog before it ships.
///
/// Usage: content_linter <catalog.json> [--start <node_id>]

use narrative_interpreter::core::engine::EngineConfig;
use narrative_interpreter::core::lint::lint_catalog;
use narrative_interpreter::schema::catalog::Catalog;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <catalog.json> [--start <node_id>]");
        process::exit(0);
    }

    let catalog_path = &args[1];
    let mut start_node = EngineConfig::default().start_node;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--start" && i + 1 < args.len() {
            i += 1;
            start_node = args[i].clone();
        }
        i += 1;
    }

    let catalog = match Catalog::load(Path::new(catalog_path)) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("ERROR: Failed to load catalog: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} nodes, {} personas, {} locations",
        catalog.nodes.len(),
        catalog.personas.len(),
        catalog.locations.len()
    );

    let report = lint_catalog(&catalog, &start_node);

    println!("\n=== Content Lint Report ===\n");

    if report.is_clean() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if report.errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}
