//! Command-line access to an amem memory store.

use amem_rs::config::AmemConfig;
use amem_rs::memory::{
    Attributes, Extras, FieldKind, FieldRegistry, FieldValue, MemoryError, MemorySystem,
};
use amem_rs::{init_logging, open_memory_system, search_options};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde_json::{Value, json};
use std::path::PathBuf;

/// Command-line options for the amem client.
#[derive(Parser)]
#[command(name = "amem", version)]
struct Cli {
    /// Optional path to an amem.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the file store directory
    #[arg(long)]
    store_path: Option<String>,
    /// Override the collection name
    #[arg(long)]
    collection: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a memory and print its id
    Add {
        content: String,
        /// Attribute as key=value; repeatable
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// Print a memory, counting the retrieval
    Read { id: String },
    /// Update a memory's content and/or attributes
    Update {
        id: String,
        #[arg(long)]
        content: Option<String>,
        /// Edit reason recorded with a content change
        #[arg(long)]
        reason: Option<String>,
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// Delete a memory
    Delete { id: String },
    /// Hybrid search: exact extras filter first, then similarity
    Search {
        query: String,
        #[arg(long)]
        k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        /// Extras that must match exactly; repeatable
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filter: Vec<String>,
    },
    /// Print ids whose extras equal the given attributes exactly
    Filter {
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// Update the first memory whose extras match, or insert a new one
    Upsert {
        content: String,
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// Print every memory
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let system = open_memory_system(&config)
        .await
        .context("failed to open memory system")?;
    info!("memory system ready (records={})", system.len());
    let output = run(cli.command, &system, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AmemConfig> {
    let mut config = if let Some(path) = cli.config.as_ref() {
        AmemConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        let layered = AmemConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(path) = cli.store_path.as_ref() {
        config.store.path = Some(path.clone());
    }
    if let Some(collection) = cli.collection.as_ref() {
        config.store.collection = collection.clone();
    }
    config.validate().context("invalid config")?;
    Ok(config)
}

async fn run(command: Command, system: &MemorySystem, config: &AmemConfig) -> anyhow::Result<Value> {
    let registry = system.registry().as_ref();
    let output = match command {
        Command::Add { content, attrs } => {
            let id = system.add(content, parse_attributes(registry, &attrs)?).await?;
            json!({ "id": id })
        }
        Command::Read { id } => {
            let record = system.read(&id).await?.ok_or(MemoryError::NotFound(id))?;
            serde_json::to_value(record)?
        }
        Command::Update {
            id,
            content,
            reason,
            attrs,
        } => {
            let mut attributes = parse_attributes(registry, &attrs)?;
            if let Some(content) = content {
                attributes.insert("content".to_string(), FieldValue::Text(content));
            }
            let updated = match reason.as_deref() {
                Some(reason) => system.update_with_reason(&id, attributes, reason).await?,
                None => system.update(&id, attributes).await?,
            };
            json!({ "id": id, "updated": updated })
        }
        Command::Delete { id } => {
            let deleted = system.delete(&id).await?;
            json!({ "id": id, "deleted": deleted })
        }
        Command::Search {
            query,
            k,
            threshold,
            filter,
        } => {
            let mut options = search_options(&config.search);
            if let Some(k) = k {
                options.k = k;
            }
            if let Some(threshold) = threshold {
                options.similarity_threshold = Some(threshold);
            }
            if !filter.is_empty() {
                options.filter = Some(parse_extras(&filter)?);
            }
            serde_json::to_value(system.search(&query, &options).await?)?
        }
        Command::Filter { attrs } => {
            json!(system.filter_by_exact_attributes(&parse_extras(&attrs)?))
        }
        Command::Upsert { content, attrs } => {
            let outcome = system
                .upsert_by_exact_attributes(content, parse_extras(&attrs)?)
                .await?;
            serde_json::to_value(outcome)?
        }
        Command::List => serde_json::to_value(system.records())?,
    };
    Ok(output)
}

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("expected KEY=VALUE, got {raw:?}"),
    }
}

fn parse_extras(raw: &[String]) -> anyhow::Result<Extras> {
    raw.iter()
        .map(|pair| split_pair(pair).map(|(key, value)| (key.to_string(), value.to_string())))
        .collect()
}

fn parse_attributes(registry: &FieldRegistry, raw: &[String]) -> anyhow::Result<Attributes> {
    let mut attributes = Attributes::new();
    for pair in raw {
        let (key, value) = split_pair(pair)?;
        attributes.insert(key.to_string(), parse_attribute(registry, key, value)?);
    }
    Ok(attributes)
}

/// Interpret a command-line value according to the field's kind.
///
/// Lists accept JSON arrays or comma-separated items. Malformed values are
/// errors rather than defaults.
fn parse_attribute(registry: &FieldRegistry, key: &str, raw: &str) -> anyhow::Result<FieldValue> {
    let value = match registry.rule(key).map(|rule| rule.kind()) {
        None | Some(FieldKind::Text) => FieldValue::Text(raw.to_string()),
        Some(FieldKind::List) if !raw.trim_start().starts_with('[') => FieldValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Some(FieldKind::Integer) => FieldValue::Integer(
            raw.trim()
                .parse()
                .with_context(|| format!("{key} expects an integer"))?,
        ),
        Some(_) => registry
            .deserialize_strict(key, &Value::String(raw.to_string()))
            .with_context(|| format!("invalid value for {key}"))?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{parse_attribute, parse_extras};
    use amem_rs::memory::{FieldRegistry, FieldValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn attributes_follow_field_kinds() {
        let registry = FieldRegistry::for_memory_records();
        assert_eq!(
            parse_attribute(&registry, "tags", "rust, memory").expect("tags"),
            FieldValue::from(vec!["rust", "memory"])
        );
        assert_eq!(
            parse_attribute(&registry, "keywords", "[\"a\",\"b\"]").expect("keywords"),
            FieldValue::from(vec!["a", "b"])
        );
        assert_eq!(
            parse_attribute(&registry, "retrieval_count", "3").expect("count"),
            FieldValue::Integer(3)
        );
        assert!(parse_attribute(&registry, "retrieval_count", "three").is_err());
        assert!(parse_attribute(&registry, "created_at", "last week").is_err());
        assert!(parse_attribute(&registry, "keywords", "[\"unterminated").is_err());
        assert!(parse_attribute(&registry, "extras", "{not json").is_err());
        assert!(matches!(
            parse_attribute(&registry, "created_at", "2024-01-02T03:04:05Z").expect("timestamp"),
            FieldValue::Timestamp(_)
        ));
        assert_eq!(
            parse_attribute(&registry, "project", "amem").expect("extra"),
            FieldValue::from("amem")
        );
    }

    #[test]
    fn extras_require_key_value_pairs() {
        let extras = parse_extras(&["topic=rust".to_string(), "team=core=x".to_string()])
            .expect("extras");
        assert_eq!(extras["topic"], "rust");
        assert_eq!(extras["team"], "core=x");
        assert!(parse_extras(&["novalue".to_string()]).is_err());
        assert!(parse_extras(&["=x".to_string()]).is_err());
    }
}
