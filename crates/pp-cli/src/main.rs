//! PR Preview CLI
//!
//! Developer tool for the extension backend: extract bundle filenames from
//! saved CI logs, inspect and validate rule sets synthesized from persisted
//! association tables, and replay scripted transition sequences.

use std::fs;

use clap::{Parser, Subcommand};

use pp_core::rules::{synthesize, Endpoints, MAX_SESSION_RULES};
use pp_core::{extract_entrypoint_assets, AssociationTable};

mod simulate;

#[derive(Parser)]
#[command(name = "pp-cli")]
#[command(about = "PR preview log extractor and rule-set tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract bundle filenames from a saved CI log
    Extract {
        /// Log file to scan
        #[arg(short, long)]
        input: String,

        /// Attach the filenames to a PR id and print a build reference
        #[arg(short, long)]
        pr: Option<String>,

        /// Machine-readable JSON output
        #[arg(short, long)]
        json: bool,
    },

    /// Synthesize the redirect rule set from a persisted association table
    Rules {
        /// Association table JSON file (the prTabs record)
        #[arg(short, long)]
        table: String,

        /// Override the asset origin
        #[arg(short, long)]
        origin: Option<String>,
    },

    /// Validate a persisted association table
    Check {
        /// Association table JSON file
        #[arg(short, long)]
        table: String,
    },

    /// Replay a scripted message sequence against in-memory adapters
    Simulate {
        /// Script file: a JSON array of runtime messages
        #[arg(short, long)]
        script: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input, pr, json } => cmd_extract(&input, pr.as_deref(), json),
        Commands::Rules { table, origin } => cmd_rules(&table, origin.as_deref()),
        Commands::Check { table } => cmd_check(&table),
        Commands::Simulate { script } => simulate::run(&script),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_extract(input: &str, pr: Option<&str>, json: bool) -> Result<(), String> {
    let text = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let assets = extract_entrypoint_assets(&text);
    if assets.is_empty() {
        return Err(format!("No 'Entrypoint main' line with bundle filenames in '{}'", input));
    }

    if let Some(pr) = pr {
        let build = assets.into_build_ref(pr);
        if json {
            let pretty = serde_json::to_string_pretty(&build)
                .map_err(|e| format!("Failed to serialize build reference: {}", e))?;
            println!("{pretty}");
        } else {
            println!("PR {}:", build.pr_id);
            print_filename("runtime", build.runtime_asset.as_deref());
            print_filename("script", build.main_script_asset.as_deref());
            print_filename("style", build.main_style_asset.as_deref());
        }
        return Ok(());
    }

    if json {
        let pretty = serde_json::to_string_pretty(&assets)
            .map_err(|e| format!("Failed to serialize filenames: {}", e))?;
        println!("{pretty}");
    } else {
        print_filename("runtime", assets.runtime_js.as_deref());
        print_filename("script", assets.main_js.as_deref());
        print_filename("style", assets.main_css.as_deref());
    }

    Ok(())
}

fn print_filename(label: &str, filename: Option<&str>) {
    match filename {
        Some(filename) => println!("  {label:8} {filename}"),
        None => println!("  {label:8} (not found)"),
    }
}

fn cmd_rules(table_path: &str, origin: Option<&str>) -> Result<(), String> {
    let table = load_table(table_path)?;
    let endpoints = match origin {
        Some(origin) => Endpoints::with_origin(origin.trim_end_matches('/')),
        None => Endpoints::default(),
    };

    let rules = synthesize(&table, &endpoints);
    let pretty = serde_json::to_string_pretty(&rules)
        .map_err(|e| format!("Failed to serialize rules: {}", e))?;
    println!("{pretty}");
    println!();
    println!("{} rules for {} tabs", rules.len(), table.len());

    Ok(())
}

fn cmd_check(table_path: &str) -> Result<(), String> {
    let table = load_table(table_path)?;

    let mut idle_entries = 0usize;
    for (tab_id, build) in table.iter() {
        if !build.is_actionable() {
            println!("  tab {tab_id}: PR {} has no asset filenames (no rules will be emitted)", build.pr_id);
            idle_entries += 1;
        }
    }

    let rules = synthesize(&table, &Endpoints::default());
    for rule in &rules {
        regex::Regex::new(&rule.match_pattern)
            .map_err(|e| format!("Rule {} has an invalid match pattern: {}", rule.id, e))?;
    }

    println!("Table '{}' is valid", table_path);
    println!("  Tabs:         {}", table.len());
    println!("  Idle entries: {}", idle_entries);
    println!("  Rules:        {} (platform ceiling {})", rules.len(), MAX_SESSION_RULES);

    if rules.len() > MAX_SESSION_RULES {
        return Err(format!(
            "Rule count {} exceeds the platform ceiling of {}",
            rules.len(),
            MAX_SESSION_RULES
        ));
    }

    Ok(())
}

fn load_table(path: &str) -> Result<AssociationTable, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid association table in '{}': {}", path, e))
}
