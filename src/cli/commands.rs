//! CLI command implementations
//!
//! Every command opens the store, runs, closes the store and prints one
//! response object. A failed command still closes the store; the command's
//! own error wins over a close error.

use std::convert::TryFrom;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::backup::{BackupManager, BackupOptions};
use crate::executor::{FieldPredicate, PredicateFilter, Query, ResultSorter, SortSpec};
use crate::observability::{Logger, Severity};
use crate::restore::{RestoreManager, RestoreOptions};
use crate::storage::{Db, DbOptions, StoreLocation};

use super::args::{Cli, Command};
use super::document::{parse_id, Document};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Configuration file structure
///
/// Every section is optional; flags given on the command line override the
/// file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store location, a directory or `:mem:`
    #[serde(default)]
    pub store: Option<String>,

    /// Minimum log severity
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub db: DbOptions,

    #[serde(default)]
    pub backup: BackupOptions,

    #[serde(default)]
    pub restore: RestoreOptions,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> CliResult<()> {
        self.db.validate().map_err(CliError::config_error)?;
        self.backup
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;
        self.restore
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;

        if let Some(level) = &self.log_level {
            level
                .parse::<Severity>()
                .map_err(CliError::config_error)?;
        }

        Ok(())
    }
}

/// Parse arguments, run the command and print its response
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let data = run_command(cli)?;
    write_response(&mut io::stdout(), data)
}

/// Run a parsed command and return its response data
pub fn run_command(cli: Cli) -> CliResult<Value> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(level) = cli.log_level {
        config.log_level = Some(level);
    }
    if let Some(store) = cli.store {
        config.store = Some(store);
    }
    config.validate()?;

    if let Some(level) = &config.log_level {
        let severity = level.parse::<Severity>().map_err(CliError::config_error)?;
        Logger::set_min_severity(severity);
    }

    let location = config.store.as_deref().ok_or_else(|| {
        CliError::config_error("no store location: pass --store or set `store` in the config")
    })?;

    let db: Db<Document> = Db::open(StoreLocation::parse(location), config.db.clone())?;
    let result = execute(&db, cli.command, &config);
    let closed = db.close();

    let data = result?;
    closed?;
    Ok(data)
}

fn execute(db: &Db<Document>, command: Command, config: &Config) -> CliResult<Value> {
    match command {
        Command::Count => Ok(json!({ "count": db.count()? })),

        Command::Get { id } => Ok(db.get(parse_id(&id))?.into_value()),

        Command::Put { json } => {
            let value = match json {
                Some(text) => serde_json::from_str(&text)?,
                None => read_request(&mut io::stdin().lock())?,
            };
            let document = Document::try_from(value).map_err(CliError::invalid_input)?;
            db.put(&document)?;
            Ok(json!({ "id": document.as_value()["id"] }))
        }

        Command::Del { ids } => {
            let keys: Vec<_> = ids.iter().map(|id| parse_id(id)).collect();
            let count = keys.len();
            db.del_many(keys)?;
            Ok(json!({ "deleted": count }))
        }

        Command::Find {
            predicates,
            sort,
            limit,
        } => find(db, &predicates, sort.as_deref(), limit),

        Command::Backup { output, level } => {
            let mut options = config.backup.clone();
            if let Some(level) = level {
                options.compression_level = level;
            }
            let summary = BackupManager::backup_to_path(db, &output, &options)?;
            Ok(serde_json::to_value(summary)?)
        }

        Command::Restore { input, batch_size } => {
            let mut options = config.restore.clone();
            if let Some(size) = batch_size {
                options.batch_size = size;
            }
            let summary = RestoreManager::restore_from_path(db, &input, &options)?;
            Ok(serde_json::to_value(summary)?)
        }
    }
}

fn find(
    db: &Db<Document>,
    predicates: &[String],
    sort: Option<&str>,
    limit: Option<usize>,
) -> CliResult<Value> {
    let predicates = predicates
        .iter()
        .map(|text| FieldPredicate::parse(text))
        .collect::<Result<Vec<_>, _>>()
        .map_err(CliError::invalid_input)?;
    let sort = sort
        .map(SortSpec::parse)
        .transpose()
        .map_err(CliError::invalid_input)?;

    let mut query = Query::new();
    if !predicates.is_empty() {
        query = query.filter(move |doc: &Document| {
            PredicateFilter::matches(doc.as_value(), &predicates)
        });
    }
    if let Some(spec) = sort {
        query = query.sort(move |a: &Document, b: &Document| {
            ResultSorter::compare(&spec, a.as_value(), b.as_value())
        });
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let result = db.find_with_stats(query)?;
    Ok(json!({
        "count": result.len(),
        "scanned": result.scanned_count,
        "limit_reached": result.limit_reached,
        "records": result
            .into_records()
            .into_iter()
            .map(Document::into_value)
            .collect::<Vec<_>>(),
    }))
}
