//! zesk-sync CLI
//!
//! Command-line tool for diffing schema dumps and rendering relationship
//! queries from class declarations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use zesk_orm::{member_query, LinkOptions, MetadataRegistry, Record};
use zesk_schema::{
    parse_tables, DiffOptions, MySqlDialect, PostgresDialect, SchemaDialect, ScriptDatabase,
    SqlValue, Synchronizer, Table,
};

/// Schema synchronization and link queries for the zesk ORM.
#[derive(Parser)]
#[command(name = "zesk-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL dialect used to render statements.
    #[arg(short, long, env = "ZESK_DIALECT", value_enum, default_value_t = DialectName::Mysql)]
    dialect: DialectName,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Skip nullability changes on indexed columns.
    #[arg(long)]
    no_follow_keys: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DialectName {
    Mysql,
    Postgres,
}

impl DialectName {
    fn dialect(self) -> Box<dyn SchemaDialect> {
        match self {
            Self::Mysql => Box::new(MySqlDialect::new()),
            Self::Postgres => Box::new(PostgresDialect::new()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the DDL bringing a live schema dump in line with a declared one.
    Diff {
        /// Declared CREATE TABLE script.
        declared: PathBuf,

        /// Live CREATE TABLE script.
        live: PathBuf,

        /// Only diff this table.
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Show the DDL bringing a live schema dump in line with declared classes.
    Sync {
        /// JSON class declaration file.
        classes: PathBuf,

        /// Live CREATE TABLE script.
        live: PathBuf,

        /// Only sync this class.
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Render the query joining a class to another along a member path.
    Link {
        /// JSON class declaration file.
        classes: PathBuf,

        /// Root class of the query.
        class: String,

        /// Class to link to.
        target: String,

        /// Dotted member path, defaults to the root class's link to the target.
        #[arg(short, long)]
        path: Option<String>,

        /// Alias for the last joined table.
        #[arg(short, long)]
        alias: Option<String>,

        /// Use LEFT OUTER joins.
        #[arg(long)]
        optional: bool,
    },

    /// Render the query selecting a has-many member of one object.
    Member {
        /// JSON class declaration file.
        classes: PathBuf,

        /// Class of the object.
        class: String,

        /// Has-many member.
        member: String,

        /// Id of the object; omitted for a new object.
        #[arg(long)]
        id: Option<i64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let output = run(&cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let options = DiffOptions {
        follow_keys: !cli.no_follow_keys,
    };
    match &cli.command {
        Commands::Diff {
            declared,
            live,
            table,
        } => {
            let sql = read(declared)?;
            let mut tables = parse_tables(&sql)
                .with_context(|| format!("Failed to parse {}", declared.display()))?;
            if let Some(name) = table {
                tables.retain(|t| t.name.eq_ignore_ascii_case(name));
                if tables.is_empty() {
                    bail!("Table '{name}' is not declared in {}", declared.display());
                }
            }
            synchronize(cli.dialect, live, &tables, options)
        }

        Commands::Sync {
            classes,
            live,
            class,
        } => {
            let registry = load_registry(classes)?;
            let names = match class {
                Some(class) => vec![class.clone()],
                None => registry.class_names(),
            };
            let mut tables = Vec::with_capacity(names.len());
            for name in &names {
                let base = registry.class(name)?;
                let table = base
                    .declared_table()
                    .with_context(|| format!("Failed to build the table for class '{name}'"))?;
                tables.push(table);
            }
            synchronize(cli.dialect, live, &tables, options)
        }

        Commands::Link {
            classes,
            class,
            target,
            path,
            alias,
            optional,
        } => {
            let registry = load_registry(classes)?;
            let mut options = LinkOptions {
                path: path.clone(),
                alias: alias.clone(),
                ..LinkOptions::default()
            };
            if *optional {
                options = options.optional();
            }
            let mut query = registry.select(class)?;
            query.link(&registry, target, options)?;
            Ok(query.to_sql(cli.dialect.dialect().as_ref()))
        }

        Commands::Member {
            classes,
            class,
            member,
            id,
        } => {
            let registry = load_registry(classes)?;
            let mut object = Record::new(class.clone());
            if let Some(id) = id {
                object = object.with_id(SqlValue::Int(*id));
            }
            let query = member_query(&registry, &object, member)?;
            debug!(class = %class, member = %member, "Rendered member query");
            Ok(query.to_sql(cli.dialect.dialect().as_ref()))
        }
    }
}

/// Diffs each declared table against a live dump, one statement per line.
fn synchronize(
    dialect: DialectName,
    live: &Path,
    tables: &[Table],
    options: DiffOptions,
) -> anyhow::Result<String> {
    let database = ScriptDatabase::new(dialect.dialect());
    let loaded = database
        .load_file(live)
        .with_context(|| format!("Failed to load {}", live.display()))?;
    debug!(tables = loaded, path = %live.display(), "Loaded live schema");
    let synchronizer = Synchronizer::with_options(&database, options);
    let mut lines = Vec::new();
    for table in tables {
        let statements = synchronizer
            .update(table)
            .with_context(|| format!("Failed to diff table '{}'", table.name))?;
        if statements.is_empty() {
            info!(table = %table.name, "Table is up to date");
        }
        lines.extend(statements.into_iter().map(|sql| format!("{sql};")));
    }
    Ok(lines.join("\n"))
}

fn load_registry(path: &Path) -> anyhow::Result<MetadataRegistry> {
    let json = read(path)?;
    MetadataRegistry::from_json(&json)
        .with_context(|| format!("Failed to parse class declarations in {}", path.display()))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
