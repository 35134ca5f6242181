use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use azrm::azure::authorizer::{Authorizer, StaticTokenAuthorizer};
use azrm::azure::client::ArmClient;
use azrm::azure::http::{format_arm_error, ArmHttpClient};
use azrm::config::Config;
use azrm::resource::{self, get_registry, get_resource, schema, ChangePlan, ReadOutcome, Resource, ResourceContext, ResourceData};

/// Version injected at compile time via AZRM_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZRM_VERSION") {
    Some(v) => v,
    None => "dev",
};

/// Manage Azure Resource Manager resources declaratively
#[derive(Parser, Debug)]
#[command(name = "azrm", version = VERSION, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Configuration file (defaults to <config dir>/azrm/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported resource types
    Resources,
    /// Print the schema of a resource type
    Schema { resource_type: String },
    /// Work with resource IDs
    Id {
        #[command(subcommand)]
        command: IdCommand,
    },
    /// Check the configured credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Create a resource from an arguments file (YAML or JSON)
    Create {
        resource_type: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Read a resource by ID
    Read { resource_type: String, id: String },
    /// Update a resource in place from an arguments file
    Update {
        resource_type: String,
        id: String,
        #[arg(short, long)]
        file: PathBuf,
        /// Delete and create again when a field that cannot change in place changed
        #[arg(long)]
        replace: bool,
    },
    /// Delete a resource by ID
    Delete { resource_type: String, id: String },
}

#[derive(Subcommand, Debug)]
enum IdCommand {
    /// Validate an ID and print it in canonical form
    Parse {
        resource_type: String,
        id: String,
        /// Accept any casing of the segment names
        #[arg(long)]
        insensitive: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Validate the configuration, then acquire a token
    Validate {
        /// Only validate, without contacting the token endpoint
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", log_path.display(), e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azrm {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azrm").join("azrm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azrm").join("azrm.log");
    }
    PathBuf::from("azrm.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        match err.downcast_ref::<azrm::Error>() {
            Some(arm) => eprintln!("Error: {}", format_arm_error(arm)),
            None => eprintln!("Error: {:#}", err),
        }
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Resources => {
            for service in get_registry() {
                println!("{} ({})", service.name, service.website_categories.join(", "));
                for resource in &service.resources {
                    println!("  {}", resource.resource_type());
                }
            }
            Ok(())
        },
        Command::Schema { resource_type } => {
            let resource = lookup(&resource_type)?;
            print_json(&schema::describe(&resource.schema()))
        },
        Command::Id {
            command: IdCommand::Parse { resource_type, id, insensitive },
        } => {
            let resource = lookup(&resource_type)?;
            let canonical = if insensitive {
                resource.normalize_id(&id)?
            } else {
                resource.validate_id(&id)?;
                id
            };
            println!("{}", canonical);
            Ok(())
        },
        Command::Auth {
            command: AuthCommand::Validate { offline },
        } => {
            let config = load_config(args.config.as_deref())?;
            let method = config.auth_builder().build()?;
            method.validate()?;
            println!("{}: configuration is valid", method.name());

            if !offline {
                let environment = config.environment()?;
                let http = ArmHttpClient::new()?;
                method
                    .authorizer(http.inner(), &environment, &environment.token_audience)
                    .await
                    .context("acquiring a token")?;
                println!("{}: token acquired", method.name());
            }
            Ok(())
        },
        Command::Create { resource_type, file } => {
            let resource = lookup(&resource_type)?;
            let config = read_arguments(&file)?;
            let mut data = resource::prepare(resource, config)?;

            let ctx = connect(args.config.as_deref()).await?;
            resource.create(&ctx, &mut data).await?;
            print_state(resource, &data)
        },
        Command::Read { resource_type, id } => {
            let resource = lookup(&resource_type)?;
            let id = resource.normalize_id(&id)?;
            let ctx = connect(args.config.as_deref()).await?;

            let mut data = ResourceData::from_state(id.clone(), Map::new());
            match resource.read(&ctx, &mut data).await? {
                ReadOutcome::Found => print_state(resource, &data),
                ReadOutcome::Removed => bail!("{} does not exist", id),
            }
        },
        Command::Update {
            resource_type,
            id,
            file,
            replace,
        } => {
            let resource = lookup(&resource_type)?;
            let id = resource.normalize_id(&id)?;
            let proposed = read_arguments(&file)?;
            let ctx = connect(args.config.as_deref()).await?;

            let mut current = ResourceData::from_state(id.clone(), Map::new());
            if resource.read(&ctx, &mut current).await? == ReadOutcome::Removed {
                bail!("{} does not exist", id);
            }

            let prior = current.into_values();
            let mut data = resource::prepare_update(resource, &id, prior.clone(), proposed)?;
            match resource::plan_change(resource, &prior, data.values()) {
                ChangePlan::NoChange => {
                    println!("{} is up to date", id);
                    Ok(())
                },
                ChangePlan::Update(fields) => {
                    println!("updating {} in place", fields.join(", "));
                    resource.update(&ctx, &mut data).await?;
                    print_state(resource, &data)
                },
                ChangePlan::Replace(fields) if replace => {
                    println!("replacing {}: {} changed", id, fields.join(", "));
                    resource.delete(&ctx, &mut data).await?;
                    let mut created = resource::prepare(resource, arguments_only(resource, data.into_values()))?;
                    resource.create(&ctx, &mut created).await?;
                    print_state(resource, &created)
                },
                ChangePlan::Replace(fields) => {
                    bail!(
                        "changing {} requires replacing {}; run again with --replace",
                        fields.join(", "),
                        id
                    )
                },
            }
        },
        Command::Delete { resource_type, id } => {
            let resource = lookup(&resource_type)?;
            let id = resource.normalize_id(&id)?;
            let ctx = connect(args.config.as_deref()).await?;

            let mut data = ResourceData::from_state(id.clone(), Map::new());
            resource.delete(&ctx, &mut data).await?;
            println!("deleted {}", id);
            Ok(())
        },
    }
}

fn lookup(resource_type: &str) -> Result<&'static dyn Resource> {
    match get_resource(resource_type) {
        Some(resource) => Ok(resource),
        None => bail!(
            "unknown resource type {:?}; run `azrm resources` for the supported ones",
            resource_type
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?.with_env(|key| std::env::var(key).ok()),
        None => Config::load()?,
    };
    Ok(config)
}

/// Authenticate and build the context resource operations run in
async fn connect(path: Option<&Path>) -> Result<ResourceContext> {
    let config = load_config(path)?;
    let environment = config.environment()?;
    let http = ArmHttpClient::new()?;

    let authorizer: Arc<dyn Authorizer> = match &config.access_token {
        Some(token) => Arc::new(StaticTokenAuthorizer::new(token.as_str())),
        None => {
            let method = config.auth_builder().build()?;
            method.validate()?;
            method
                .authorizer(http.inner(), &environment, &environment.token_audience)
                .await
                .context("acquiring a token")?
        },
    };

    let client = ArmClient::new(authorizer, http, &environment.resource_manager);
    Ok(match config.subscription_id {
        Some(subscription_id) => ResourceContext::new(client, subscription_id),
        None => ResourceContext::without_subscription(client),
    })
}

/// YAML is a superset of JSON, so one parser reads both
fn read_arguments(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn arguments_only(resource: &dyn Resource, values: Map<String, Value>) -> Value {
    let arguments = resource.arguments();
    Value::Object(
        values
            .into_iter()
            .filter(|(key, _)| arguments.contains_key(key.as_str()))
            .collect(),
    )
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the state with sensitive values masked
fn print_state(resource: &dyn Resource, data: &ResourceData) -> Result<()> {
    let schema = resource.schema();
    let mut values = data.values().clone();
    for (key, value) in values.iter_mut() {
        if schema.get(key.as_str()).is_some_and(|field| field.sensitive) && !value.is_null() {
            *value = json!("(sensitive)");
        }
    }
    print_json(&json!({ "id": data.id(), "values": values }))
}
