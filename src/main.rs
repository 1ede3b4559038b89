//! Silo CLI - store, link and list resources from the command line

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use silo::config::{self, CacheConfig, SiloConfig};
use silo::ui::{self, Icons};
use silo::{build_filter, build_group, parse_id, Error, Predicate, SearchOptions, Silo, SqliteStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "silo")]
#[command(version = "0.1.0")]
#[command(about = "Entity-attribute-link resource store")]
#[command(long_about = r#"
Silo stores arbitrary resources: a class, a map of scalar attributes and
labeled links to other resources, backed by SQLite.

Example usage:
  silo init
  silo create person --attr name="John Doe" --attr age=42
  silo link 1 2 --label son
  silo get 1 --links --resolve
  silo search --where class:=:person --order "name, age DESC" --limit 10
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Table prefix (overrides config)
    #[arg(short, long, global = true)]
    prefix: Option<String>,

    /// Snapshot cache backend (overrides config)
    #[arg(long, global = true, value_enum)]
    cache: Option<CacheArg>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheArg {
    Inline,
    File,
    Disabled,
}

impl CacheArg {
    fn as_str(&self) -> &'static str {
        match self {
            CacheArg::Inline => "inline",
            CacheArg::File => "file",
            CacheArg::Disabled => "disabled",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the config file and create the tables
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Drop the tables (data included)
    Destroy,

    /// Create a resource
    Create {
        /// Resource class
        class: String,

        /// Attribute as name=value (repeatable)
        #[arg(short, long = "attr", value_name = "NAME=VALUE")]
        attrs: Vec<String>,

        /// Attributes as a JSON object
        #[arg(long, conflicts_with = "attrs")]
        json: Option<String>,
    },

    /// Show a resource
    Get {
        id: String,

        /// Include links
        #[arg(short, long)]
        links: bool,

        /// Resolve linked resources one level deep
        #[arg(short, long, requires = "links")]
        resolve: bool,
    },

    /// Set (or delete, with an empty value) one attribute
    SetAttr {
        id: String,
        name: String,
        value: String,

        /// Parse the value as a JSON scalar
        #[arg(long)]
        json: bool,
    },

    /// Change the class of a resource, or create one when the id is empty
    SetClass {
        id: String,
        class: String,
    },

    /// Link a parent resource to a child
    Link {
        parent: String,
        child: String,

        /// Link label (defaults to the child's class)
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Remove links: `unlink ID` drops every link from and to ID,
    /// `unlink PARENT CHILD` drops links between the pair (0 matches any side)
    Unlink {
        parent: Option<String>,
        child: Option<String>,
    },

    /// List resources
    Search {
        /// Filter as field:op:value (repeatable)
        #[arg(short = 'w', long = "where", value_name = "FIELD:OP:VALUE")]
        filters: Vec<String>,

        /// Match any filter instead of all
        #[arg(long)]
        any: bool,

        /// Sort keys, e.g. "name, age DESC"
        #[arg(short, long)]
        order: Option<String>,

        #[arg(short, long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,

        /// Print the assembled query instead of running it
        #[arg(long)]
        debug: bool,
    },

    /// Drop every cached snapshot
    EmptyCache,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<Error>() {
            Some(silo_err) if silo_err.is_client_error() => {
                ui::error(&silo_err.to_string());
                std::process::exit(2);
            }
            _ => Err(err),
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings = SiloConfig::load(&config_path)?.unwrap_or_default();
    apply_overrides(&mut settings, &cli);

    if let Commands::Init { force } = cli.command {
        settings.save(&config_path, force)?;
    }

    let silo = open_silo(&settings)?;
    let format = cli.format;

    match cli.command {
        Commands::Init { .. } => {
            silo.create_schema()?;
            let tables = silo.store().list_tables()?;
            emit(format, &serde_json::json!({ "config": config_path, "tables": tables }), || {
                ui::header(Icons::DATABASE, "Silo initialized");
                ui::info("Config", &config_path.display().to_string());
                ui::info("Database", &settings.database_path().display().to_string());
                ui::info("Tables", &tables.join(", "));
            })
        }
        Commands::Destroy => {
            silo.destroy_schema()?;
            emit(format, &serde_json::json!({ "destroyed": silo.store().prefix() }), || {
                ui::success(&format!("Dropped tables with prefix '{}'", silo.store().prefix()));
            })
        }
        Commands::Create { class, attrs, json } => {
            let id = match json {
                Some(json) => {
                    let value: serde_json::Value = serde_json::from_str(&json)?;
                    let Some(object) = value.as_object() else {
                        anyhow::bail!("--json expects an object of attributes");
                    };
                    silo.create_from_json(&class, object)?
                }
                None => silo.create(&class, parse_attrs(&attrs)?)?,
            };
            emit(format, &serde_json::json!({ "id": id }), || {
                ui::success(&format!("Created {} #{}", class, id));
            })
        }
        Commands::Get { id, links, resolve } => {
            let id = require_id(&id)?;
            let Some(resource) = silo.get(id, links, resolve)? else {
                anyhow::bail!("resource {} not found", id);
            };
            emit(format, &resource, || {
                println!("{} {}", Icons::BOX, ui::resource_title(&resource.class, resource.id));
                println!("{}", ui::attribute_table(&resource));
                if let Some(links) = &resource.links {
                    ui::section(&format!("{} Parents", Icons::LINK));
                    print_or_none(&ui::links_table(&links.from));
                    ui::section(&format!("{} Children", Icons::LINK));
                    print_or_none(&ui::links_table(&links.to));
                }
            })
        }
        Commands::SetAttr { id, name, value, json } => {
            let id = require_id(&id)?;
            let stored = if json {
                silo.set_attribute_json(id, &name, &serde_json::from_str(&value)?)?
            } else {
                silo.set_attribute(id, &name, value.as_str())?
            };
            emit(format, &serde_json::json!({ "id": id, "attribute": name, "value": stored }), || {
                match &stored {
                    Some(value) => ui::success(&format!("#{} {} = {}", id, name, value)),
                    None => ui::info("Not stored", &format!("#{} {}", id, name)),
                }
            })
        }
        Commands::SetClass { id, class } => {
            let id = silo.set_meta(parse_id(&id)?, &class)?;
            emit(format, &serde_json::json!({ "id": id, "class": class }), || {
                ui::success(&format!("#{} is a {}", id, class));
            })
        }
        Commands::Link { parent, child, label } => {
            let (parent, child) = (require_id(&parent)?, require_id(&child)?);
            let linked = silo.link(parent, child, label.as_deref())?;
            emit(format, &serde_json::json!({ "linked": linked }), || {
                if linked {
                    ui::success(&format!("Linked #{} -> #{}", parent, child));
                } else {
                    ui::warn(&format!("#{} or #{} does not exist", parent, child));
                }
            })
        }
        Commands::Unlink { parent, child } => {
            let unlinked = unlink(&silo, parent.as_deref(), child.as_deref())?;
            emit(format, &serde_json::json!({ "unlinked": unlinked }), || {
                ui::success("Links removed");
            })
        }
        Commands::Search { filters, any, order, limit, offset, debug } => {
            let mut options = SearchOptions::new().debug(debug);
            if let Some(predicate) = parse_filters(&filters, any)? {
                options = options.filter(predicate);
            }
            if let Some(order) = order {
                options = options.order_by(&order)?;
            }
            if let Some(limit) = limit {
                options = options.limit(limit);
            }
            if let Some(offset) = offset {
                options = options.offset(offset);
            }

            let found = silo.search(&options)?;
            emit(format, &found, || {
                if let Some(query) = &found.query {
                    ui::header(Icons::SEARCH, "Assembled query");
                    println!("{}", query);
                    return;
                }
                ui::header(Icons::SEARCH, &format!("{} matching resources", found.total));
                print_or_none(&ui::results_table(&found.results, offset.unwrap_or(0)));
                ui::timing(found.duration);
            })
        }
        Commands::EmptyCache => {
            silo.empty_cache()?;
            let backend = silo.cache_kind().unwrap_or("disabled");
            emit(format, &serde_json::json!({ "emptied": backend }), || {
                ui::success(&format!("{} Emptied {} cache", Icons::BROOM, backend));
            })
        }
    }
}

fn apply_overrides(settings: &mut SiloConfig, cli: &Cli) {
    if let Some(database) = &cli.database {
        settings.database = Some(database.to_string_lossy().to_string());
    }
    if let Some(prefix) = &cli.prefix {
        settings.prefix = Some(prefix.clone());
    }
    if let Some(cache) = cli.cache {
        let section = settings.cache.get_or_insert_with(CacheConfig::default);
        section.backend = Some(cache.as_str().to_string());
    }
}

fn open_silo(settings: &SiloConfig) -> anyhow::Result<Silo> {
    let db_path = settings.prepare_database()?;
    let backend = settings.cache_backend()?;
    tracing::debug!(database = %db_path.display(), prefix = settings.prefix(), cache = %backend, "Opening silo");

    let store = SqliteStore::open(&db_path, settings.prefix())?;
    Ok(Silo::new(store, backend))
}

/// JSON to stdout, or the human rendering
fn emit<T: Serialize>(format: OutputFormat, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => human(),
    }
    Ok(())
}

fn print_or_none(table: &str) {
    if table.is_empty() {
        println!("{}", ui::muted("(none)"));
    } else {
        println!("{}", table);
    }
}

fn require_id(s: &str) -> anyhow::Result<u64> {
    parse_id(s)?.ok_or_else(|| Error::InvalidId(format!("'{}' is not a resource id", s)).into())
}

/// One id removes every link around it; two ids address a pair, where an
/// empty or zero side matches anything
fn unlink(silo: &Silo, parent: Option<&str>, child: Option<&str>) -> anyhow::Result<bool> {
    let Some(child) = child else {
        let Some(id) = parent else {
            return Err(Error::BadArgumentCount("unlink needs a parent or a child id".to_string()).into());
        };
        return Ok(silo.unlink_all(require_id(id)?)?);
    };

    let parent = parent.map(parse_id).transpose()?.flatten();
    let child = parse_id(child)?;
    if parent.is_none() && child.is_none() {
        return Err(Error::BadArgumentCount("unlink needs a parent or a child id".to_string()).into());
    }
    Ok(silo.unlink(parent, child)?)
}

fn parse_attrs(attrs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    attrs
        .iter()
        .map(|attr| {
            let (name, value) = attr
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("attribute '{}' is not NAME=VALUE", attr))?;
            Ok((name.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// `field:op:value` filters, joined with AND (or OR with `any`)
fn parse_filters(filters: &[String], any: bool) -> silo::Result<Option<Predicate>> {
    let parts = filters
        .iter()
        .map(|filter| {
            let mut pieces = filter.splitn(3, ':');
            match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(field), Some(op), Some(value)) => build_filter(field, op, value),
                _ => Err(Error::BadFilter(format!("'{}' is not FIELD:OP:VALUE", filter))),
            }
        })
        .collect::<silo::Result<Vec<_>>>()?;

    match parts.len() {
        0 => Ok(None),
        1 => Ok(parts.into_iter().next()),
        _ => build_group(if any { "OR" } else { "AND" }, parts).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo::CacheBackend;

    fn family() -> Silo {
        let silo = Silo::open_in_memory("test", CacheBackend::Disabled).unwrap();
        for class in ["a", "b", "c"] {
            silo.create(class, Vec::<(String, String)>::new()).unwrap();
        }
        silo.link(1, 2, None).unwrap();
        silo.link(3, 1, None).unwrap();
        silo
    }

    #[test]
    fn test_unlink_single_id_drops_both_directions() {
        let silo = family();
        assert!(unlink(&silo, Some("1"), None).unwrap());

        assert!(silo.from(1, false).unwrap().is_empty());
        assert!(silo.to(1, false).unwrap().is_empty());
    }

    #[test]
    fn test_unlink_pair_forms() {
        let silo = family();
        unlink(&silo, Some("0"), Some("1")).unwrap();
        assert!(silo.to(1, false).unwrap().is_empty());
        assert_eq!(silo.from(1, false).unwrap()["b"].len(), 1);

        unlink(&silo, Some("1"), Some("2")).unwrap();
        assert!(silo.from(1, false).unwrap().is_empty());
    }

    #[test]
    fn test_unlink_without_ids_is_rejected() {
        let silo = family();
        for (parent, child) in [(None, None), (Some("0"), Some(""))] {
            let err = unlink(&silo, parent, child).unwrap_err();
            assert!(matches!(err.downcast_ref::<Error>(), Some(Error::BadArgumentCount(_))));
        }
    }

    #[test]
    fn test_parse_filters() {
        assert!(parse_filters(&[], false).unwrap().is_none());

        let filters = vec!["class:=:person".to_string(), "name:like:%Doe".to_string()];
        let mut params = Vec::new();
        let sql = parse_filters(&filters, true).unwrap().unwrap().to_sql(&mut params);
        assert_eq!(sql, "( class = ? ) OR ( attribute = ? AND value LIKE ? )");

        let bad = vec!["class=person".to_string()];
        assert!(matches!(parse_filters(&bad, false), Err(Error::BadFilter(_))));
    }
}
