//! CLI entry point for the fiber extractor.
//!
//! Runs the extraction pipeline against a UI tree snapshot saved as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Extract every message in a snapshot
//! fiber-extract --messages snapshot.json
//!
//! # Extract the chat list
//! fiber-extract --chats snapshot.json
//!
//! # List nodes of a given type (host tag or component name)
//! fiber-extract --find-type snapshot.json MessageRow
//! ```

use std::env;
use std::fs;
use std::process;

use fiber_extractor::{
    by_type, collect_nodes, extract_chats, extract_messages, FiberTree, UiNode,
    DEFAULT_MAX_NODES,
};

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
enum Command {
    /// Extract messages from a snapshot file
    Messages(String),
    /// Extract chats from a snapshot file
    Chats(String),
    /// List nodes matching a type name
    FindType(String, String),
    /// Show help message
    Help,
}

/// Parse command line arguments (without the program name)
fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(flag) = args.first() else {
        return Ok(Command::Help);
    };

    match flag.as_str() {
        "--messages" | "-m" => args
            .get(1)
            .map(|path| Command::Messages(path.clone()))
            .ok_or_else(|| "--messages requires a snapshot file argument".to_string()),
        "--chats" | "-c" => args
            .get(1)
            .map(|path| Command::Chats(path.clone()))
            .ok_or_else(|| "--chats requires a snapshot file argument".to_string()),
        "--find-type" | "-f" => match (args.get(1), args.get(2)) {
            (Some(path), Some(name)) => Ok(Command::FindType(path.clone(), name.clone())),
            _ => Err("--find-type requires a snapshot file and a type name (e.g., --find-type snapshot.json div)".into()),
        },
        "--help" | "-h" => Ok(Command::Help),
        arg => Err(format!("Unknown argument: {}", arg)),
    }
}

/// Print help message to stdout
fn print_help() {
    println!("fiber-extract - Extract conversation records from UI tree snapshots");
    println!();
    println!("USAGE:");
    println!("    fiber-extract [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -m, --messages <FILE>           Extract messages from a snapshot");
    println!("    -c, --chats <FILE>              Extract chats from a snapshot");
    println!("    -f, --find-type <FILE> <NAME>   List nodes whose type matches NAME");
    println!("    -h, --help                      Print this help message");
    println!();
    println!("OUTPUT:");
    println!("    All output is JSON formatted to stdout.");
    println!("    Errors are written to stderr.");
}

fn load_tree(path: &str) -> Result<FiberTree, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
    FiberTree::from_json(&contents).map_err(|e| format!("Invalid snapshot {}: {}", path, e))
}

fn print_json(value: &serde_json::Value) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("[FIBER-EXTRACT] Error serializing output: {}", e);
            1
        }
    }
}

/// Handle --messages and --chats
fn handle_extract(path: &str, chats: bool) -> i32 {
    let tree = match load_tree(path) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("[FIBER-EXTRACT] {}", e);
            return 1;
        }
    };
    let Some(root) = tree.root() else {
        eprintln!("[FIBER-EXTRACT] Snapshot {} is empty", path);
        return 1;
    };

    let output = if chats {
        let outcome = extract_chats(&root, DEFAULT_MAX_NODES);
        eprintln!("[FIBER-EXTRACT] {} chats, {} skipped", outcome.records.len(), outcome.skipped);
        serde_json::json!({
            "chats": outcome.records,
            "skipped": outcome.skipped,
            "extracted_at": chrono::Utc::now().timestamp(),
        })
    } else {
        let outcome = extract_messages(&root, DEFAULT_MAX_NODES);
        eprintln!("[FIBER-EXTRACT] {} messages, {} skipped", outcome.records.len(), outcome.skipped);
        serde_json::json!({
            "messages": outcome.records,
            "skipped": outcome.skipped,
            "extracted_at": chrono::Utc::now().timestamp(),
        })
    };

    print_json(&output)
}

/// Handle --find-type
fn handle_find_type(path: &str, name: &str) -> i32 {
    let tree = match load_tree(path) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("[FIBER-EXTRACT] {}", e);
            return 1;
        }
    };
    let Some(root) = tree.root() else {
        eprintln!("[FIBER-EXTRACT] Snapshot {} is empty", path);
        return 1;
    };

    let nodes: Vec<serde_json::Value> = collect_nodes(&root, by_type(name), DEFAULT_MAX_NODES)
        .iter()
        .map(|node| {
            let props: Vec<&String> = node
                .props()
                .and_then(|p| p.as_object())
                .map(|p| p.keys().collect())
                .unwrap_or_default();
            serde_json::json!({
                "id": node.id(),
                "key": node.key(),
                "index": node.index(),
                "props": props,
            })
        })
        .collect();

    print_json(&serde_json::json!({ "type": name, "count": nodes.len(), "nodes": nodes }))
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    };

    log::debug!("Executing command: {:?}", command);

    let exit_code = match command {
        Command::Messages(path) => handle_extract(&path, false),
        Command::Chats(path) => handle_extract(&path, true),
        Command::FindType(path, name) => handle_find_type(&path, &name),
        Command::Help => {
            print_help();
            0
        }
    };

    process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_empty_is_help() {
        assert_eq!(parse_args(&[]), Ok(Command::Help));
    }

    #[test]
    fn test_parse_args_messages() {
        assert_eq!(
            parse_args(&args(&["--messages", "a.json"])),
            Ok(Command::Messages("a.json".to_string()))
        );
        assert!(parse_args(&args(&["-m"])).is_err());
    }

    #[test]
    fn test_parse_args_find_type() {
        assert_eq!(
            parse_args(&args(&["-f", "a.json", "div"])),
            Ok(Command::FindType("a.json".to_string(), "div".to_string()))
        );
        assert!(parse_args(&args(&["--find-type", "a.json"])).is_err());
    }

    #[test]
    fn test_parse_args_unknown() {
        assert_eq!(
            parse_args(&args(&["--bogus"])),
            Err("Unknown argument: --bogus".to_string())
        );
    }
}
