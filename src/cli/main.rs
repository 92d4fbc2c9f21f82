use anyhow::{anyhow, bail, Context};
use attribute_index::{
    config::Config,
    models::{Indexable, Organization},
    search::{create_registry, Index, RangeQuery},
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "attribute-index-cli")]
#[command(about = "Inspect and maintain a tenant's attribute index", long_about = None)]
struct Cli {
    /// Tenant whose index to open (defaults to the first configured tenant)
    #[arg(short, long)]
    tenant: Option<String>,

    /// Override the configured data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from a JSON lines file and save it
    Import {
        /// One `{"collection", "id", "attributes"}` object per line
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Exact or wildcard `field:value` search
    Search {
        collection: String,
        term: String,

        #[arg(short, long)]
        negate: bool,
    },

    /// Substring search over raw attribute text
    Text {
        collection: String,
        term: String,

        #[arg(short, long)]
        negate: bool,
    },

    /// Lexicographic range search; `*` leaves a bound open
    Range {
        collection: String,
        field: String,
        start: String,
        end: String,

        /// Exclude both bounds
        #[arg(short, long)]
        exclusive: bool,

        #[arg(short, long)]
        negate: bool,
    },

    /// List collection names
    Endpoints,

    /// Show document counts and save state
    Stats,

    /// Delete a user-defined collection and save
    DropCollection { name: String },
}

/// One line of an import file
#[derive(Debug, Serialize, Deserialize)]
struct ImportRecord {
    collection: String,
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// Import record bound to the tenant it is imported into
struct ImportedEntity {
    tenant: String,
    record: ImportRecord,
}

impl Indexable for ImportedEntity {
    fn document_id(&self) -> String {
        self.record.id.clone()
    }

    fn collection_name(&self) -> String {
        self.record.collection.clone()
    }

    fn tenant_name(&self) -> String {
        self.tenant.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        self.record.attributes.clone()
    }
}

fn read_import(path: &PathBuf, tenant: &str) -> anyhow::Result<Vec<Arc<dyn Indexable>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut entities: Vec<Arc<dyn Indexable>> = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid record on line {}", number + 1))?;
        entities.push(Arc::new(ImportedEntity {
            tenant: tenant.to_string(),
            record,
        }));
    }
    Ok(entities)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_index(cli: &Cli, config: &mut Config) -> anyhow::Result<Arc<Index>> {
    if let Some(dir) = &cli.data_dir {
        config.index.data_dir = dir.clone();
    }

    let tenant = match &cli.tenant {
        Some(name) => config
            .tenants
            .iter()
            .find(|t| &t.name == name)
            .ok_or_else(|| anyhow!("Tenant '{}' is not configured", name))?,
        None => config
            .tenants
            .first()
            .ok_or_else(|| anyhow!("No tenants configured"))?,
    };
    let tenant = Organization::from(tenant);

    let registry = create_registry(&config.index, std::slice::from_ref(&tenant))?;
    Ok(registry.index(&tenant.name)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    config.observability.log_level = "warn".to_string();
    attribute_index::logging::init(&config.observability)?;

    let index = open_index(&cli, &mut config)?;

    match cli.command {
        Commands::Import { file } => {
            let entities = read_import(&file, index.tenant())?;
            println!("Importing {} entities into {}", entities.len(), index.tenant());

            let report = index.reindex(entities).await?;
            index.save()?;

            println!(
                "Indexed {} entities in {:.2}s ({} failed)",
                report.indexed,
                report.elapsed.as_secs_f64(),
                report.failed.len()
            );
            for failure in &report.failed {
                eprintln!("  {}/{}: {}", failure.collection, failure.id, failure.reason);
            }
        }

        Commands::Search {
            collection,
            term,
            negate,
        } => {
            print_json(&index.search(&collection, &term, negate)?)?;
        }

        Commands::Text {
            collection,
            term,
            negate,
        } => {
            print_json(&index.search_text(&collection, &term, negate)?)?;
        }

        Commands::Range {
            collection,
            field,
            start,
            end,
            exclusive,
            negate,
        } => {
            let range = RangeQuery::new(field, &start, &end, !exclusive)?;
            print_json(&index.search_range(&collection, &range, negate)?)?;
        }

        Commands::Endpoints => {
            print_json(&index.endpoints())?;
        }

        Commands::Stats => {
            print_json(&json!({
                "path": index.path().display().to_string(),
                "stats": index.stats(),
            }))?;
        }

        Commands::DropCollection { name } => {
            if let Err(e) = index.delete_collection(&name) {
                bail!("Cannot drop {}: {}", name, e);
            }
            index.save()?;
            println!("Dropped collection {}", name);
        }
    }

    Ok(())
}
