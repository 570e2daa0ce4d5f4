use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{collections::HashSet, fs, path::PathBuf};

#[derive(Parser)]
#[command(name = "xtask", about = "shoplist workspace tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Validate a saved list file against schemas/shopping_list.schema.json
    ValidateList { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::ValidateList { file } => validate_list(&file),
    }
}

const SCHEMA: &str = include_str!("../../schemas/shopping_list.schema.json");

fn validate_list(path: &PathBuf) -> Result<()> {
    let data_text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&data_text).with_context(|| "parse json")?;
    let problems = check(&data)?;
    if !problems.is_empty() {
        eprintln!("Invalid: {}", path.display());
        for p in problems {
            eprintln!("- {}", p);
        }
        std::process::exit(1);
    }
    println!("OK: {}", path.display());
    Ok(())
}

/// Schema violations plus the one rule JSON Schema cannot say: ids are unique.
fn check(data: &serde_json::Value) -> Result<Vec<String>> {
    let schema: serde_json::Value = serde_json::from_str(SCHEMA)?;
    let compiled = jsonschema::validator_for(&schema)?;
    let mut problems: Vec<String> = compiled.iter_errors(data).map(|e| e.to_string()).collect();
    let mut seen = HashSet::new();
    for id in data.as_array().into_iter().flatten().filter_map(|it| it.get("id")?.as_str()) {
        if !seen.insert(id) { problems.push(format!("duplicate id {id:?}")); }
    }
    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_saved_list() {
        let data = json!([{"id": "1", "name": "Milk", "purchased": false}, {"id": "2", "name": "Eggs", "purchased": true}]);
        assert!(check(&data).unwrap().is_empty());
        assert!(check(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn rejects_objects_blank_names_and_duplicates() {
        assert!(!check(&json!({"id": "1"})).unwrap().is_empty());
        assert!(!check(&json!([{"id": "1", "name": " ", "purchased": false}])).unwrap().is_empty());
        assert!(!check(&json!([{"id": "1", "name": "x".repeat(51), "purchased": false}])).unwrap().is_empty());
        let dup = check(&json!([
            {"id": "1", "name": "Milk", "purchased": false},
            {"id": "1", "name": "Tea", "purchased": false}
        ])).unwrap();
        assert_eq!(dup, vec!["duplicate id \"1\"".to_string()]);
    }
}
