//! Offline maintenance tool: refresh the bundled named-character-reference
//! table from the canonical WHATWG entities.json. One-shot fetch, no retry;
//! this never runs as part of the scanning core.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::process;

use serde::Deserialize;
use tagsafe::{TagsafeError, TagsafeResult};

const ENTITIES_URL: &str = "https://html.spec.whatwg.org/entities.json";
const DEFAULT_OUTPUT: &str = "src/generated/entities.rs";

#[derive(Debug, Deserialize)]
struct EntityEntry {
    characters: String,
}

fn main() {
    let output = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    match run(&output) {
        Ok(count) => println!("✓ wrote {} entities to {}", count, output),
        Err(err) => {
            eprintln!("✗ {}", err);
            process::exit(1);
        }
    }
}

fn run(output: &str) -> TagsafeResult<usize> {
    let response = reqwest::blocking::get(ENTITIES_URL)
        .map_err(|err| TagsafeError::EntityFetch(err.to_string()))?;
    let table: BTreeMap<String, EntityEntry> = response
        .json()
        .map_err(|err| TagsafeError::EntityData(err.to_string()))?;

    // Keep only the canonical `&name;` forms; the spec also lists legacy
    // names without a trailing semicolon
    let mut entries: Vec<(String, String)> = table
        .into_iter()
        .filter_map(|(name, entry)| {
            let name = name.strip_prefix('&')?.strip_suffix(';')?.to_string();
            Some((name, entry.characters))
        })
        .collect();
    entries.sort();
    entries.dedup_by(|a, b| a.0 == b.0);

    if entries.is_empty() {
        return Err(TagsafeError::EntityData(
            "no ;-terminated entities in response".to_string(),
        ));
    }

    let mut out = String::new();
    out.push_str("// @generated by fetch-entities from ");
    out.push_str(ENTITIES_URL);
    out.push('\n');
    out.push_str("// Do not edit by hand; rerun `cargo run --bin fetch-entities` to refresh.\n\n");
    out.push_str("/// Named character references, sorted by name for binary search.\n");
    out.push_str("/// Names carry no `&` prefix or `;` suffix.\n");
    out.push_str("pub const NAMED_ENTITIES: &[(&str, &str)] = &[\n");
    for (name, characters) in &entries {
        out.push_str(&format!(
            "    (\"{}\", \"{}\"),\n",
            name,
            escape_for_literal(characters)
        ));
    }
    out.push_str("];\n");

    fs::write(output, out).map_err(|err| TagsafeError::FileWrite {
        path: output.to_string(),
        message: err.to_string(),
    })?;

    Ok(entries.len())
}

fn escape_for_literal(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => out.push_str(&format!("\\u{{{:04X}}}", c as u32)),
        }
    }
    out
}
