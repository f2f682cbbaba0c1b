//! Subcommands of the `atcache` binary.

use airtable_cache::{AirtableClient, Base, FieldValue, SnapshotStore, Table};
use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Fetch tables from Airtable and replace their snapshots
  Cache {
    /// Tables to refresh (default: every table in the config)
    tables: Vec<String>,
  },
  /// Delete every snapshot of the base
  Clear,
  /// List cached tables
  List,
  /// Print one record by id
  Get {
    table: String,
    id: String,
    /// Resolve a link field against a related table
    #[arg(short, long = "resolve", value_name = "TABLE=FIELD", value_parser = parse_pair)]
    resolve: Vec<(String, String)>,
  },
  /// Filter and order a table snapshot
  Query(QueryArgs),
}

#[derive(Args, Debug)]
pub struct QueryArgs {
  pub table: String,
  /// Keep records whose field equals VALUE (parsed as JSON when possible)
  #[arg(short, long = "filter", value_name = "FIELD=VALUE", value_parser = parse_pair)]
  pub filters: Vec<(String, String)>,
  #[arg(short, long, value_name = "FIELD")]
  pub order_by: Option<String>,
  /// Reverse the order
  #[arg(long, requires = "order_by")]
  pub desc: bool,
  /// Resolve a link field against a related table
  #[arg(short, long = "resolve", value_name = "TABLE=FIELD", value_parser = parse_pair)]
  pub resolve: Vec<(String, String)>,
  /// Print only the first record
  #[arg(long, conflicts_with = "last")]
  pub first: bool,
  /// Print only the last record
  #[arg(long)]
  pub last: bool,
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
  match command {
    Command::Cache { tables } => cache(config, tables).await,
    Command::Clear => clear(config),
    Command::List => list(config),
    Command::Get { table, id, resolve } => get(config, &table, &id, &resolve),
    Command::Query(args) => query(config, &args),
  }
}

async fn cache(config: &Config, tables: Vec<String>) -> Result<()> {
  let tables = if tables.is_empty() {
    config.tables.iter().map(|t| t.name.clone()).collect()
  } else {
    tables
  };
  if tables.is_empty() {
    return Err(eyre!("No tables given and none listed in the config"));
  }

  let client = AirtableClient::with_endpoint(&config.airtable.endpoint)?;
  let base = Base::open(
    config.airtable.base_id.as_str(),
    Config::get_api_key()?,
    client,
    &config.snapshot_config(),
  )?;

  for table in &tables {
    base
      .cache_table(table, &config.fetch_options(table))
      .await
      .map_err(|e| eyre!("Failed to cache table {}: {}", table, e))?;
    info!(table = %table, "cached");
  }

  print_json(&base.snapshots()?)
}

fn clear(config: &Config) -> Result<()> {
  store(config)?.clear()?;
  Ok(())
}

fn list(config: &Config) -> Result<()> {
  print_json(&store(config)?.list()?)
}

fn get(config: &Config, table: &str, id: &str, resolve: &[(String, String)]) -> Result<()> {
  let record = Table::new(
    config.airtable.base_id.as_str(),
    table,
    &config.snapshot_config(),
  )?
  .get(id, &links(resolve))?;
  print_json(&record)
}

fn query(config: &Config, args: &QueryArgs) -> Result<()> {
  let table = Table::new(
    config.airtable.base_id.as_str(),
    args.table.as_str(),
    &config.snapshot_config(),
  )?;

  let mut query = table.query(&links(&args.resolve))?.filter_by(
    args
      .filters
      .iter()
      .map(|(field, value)| (field.as_str(), parse_filter_value(value))),
  );
  if let Some(field) = &args.order_by {
    query = query.order_by(field, args.desc)?;
  }

  if args.first {
    print_json(&query.first())
  } else if args.last {
    print_json(&query.last())
  } else {
    print_json(&query.all())
  }
}

fn store(config: &Config) -> Result<SnapshotStore> {
  Ok(SnapshotStore::new(
    &config.snapshot_config(),
    &config.airtable.base_id,
  )?)
}

fn links(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
  pairs
    .iter()
    .map(|(table, field)| (table.as_str(), field.as_str()))
    .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Split `KEY=VALUE` at the first `=`.
fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
  }
}

/// JSON literals (`3`, `true`, `"3"`, `["a"]`) keep their type; anything else is text.
fn parse_filter_value(s: &str) -> FieldValue {
  serde_json::from_str::<serde_json::Value>(s)
    .map(FieldValue::from)
    .unwrap_or_else(|_| FieldValue::from(s))
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  #[test]
  fn test_parse_pair_splits_at_first_equals() {
    assert_eq!(
      parse_pair("Formula=a=b").unwrap(),
      ("Formula".to_string(), "a=b".to_string())
    );
    assert_eq!(
      parse_pair("Name=").unwrap(),
      ("Name".to_string(), String::new())
    );
    assert!(parse_pair("NoEquals").is_err());
    assert!(parse_pair("=value").is_err());
  }

  #[test]
  fn test_filter_values_keep_json_types() {
    assert_eq!(parse_filter_value("3"), FieldValue::from(3));
    assert_eq!(parse_filter_value("true"), FieldValue::from(true));
    assert_eq!(parse_filter_value("\"3\""), FieldValue::from("3"));
    assert_eq!(parse_filter_value("Data entry 1"), FieldValue::from("Data entry 1"));
  }

  #[test]
  fn test_query_arguments() {
    let cli = Cli::try_parse_from([
      "atcache", "query", "Table 1", "-f", "Name=X", "-o", "Number", "--desc", "-r",
      "Other=Link", "--first",
    ])
    .unwrap();

    let Command::Query(args) = cli.command else {
      panic!("expected query command");
    };
    assert_eq!(args.table, "Table 1");
    assert_eq!(args.filters, vec![("Name".to_string(), "X".to_string())]);
    assert_eq!(args.order_by.as_deref(), Some("Number"));
    assert!(args.desc);
    assert_eq!(args.resolve, vec![("Other".to_string(), "Link".to_string())]);
    assert!(args.first);
  }

  #[test]
  fn test_desc_requires_order_by() {
    assert!(Cli::try_parse_from(["atcache", "query", "T", "--desc"]).is_err());
    assert!(Cli::try_parse_from(["atcache", "query", "T", "--first", "--last"]).is_err());
  }
}
