//! fireflow - firewall policy and rule management
//!
//! Command-line front end over the fireflow library. Every command prints
//! pretty JSON on success; failures print the translated message with its
//! status class and exit non-zero.
//!
//! # Usage
//!
//! ```bash
//! fireflow firewall create --name edge --environment production --scope dc1
//! fireflow policy create --firewall 1 --name web --priority 10
//! fireflow rule create --firewall 1 --policy 1 --order-index 1 \
//!     --source-cidr 192.168.1.0/24 --destination-port-minimum 443 --destination-port-maximum 443
//! fireflow rule create --firewall 1 --policy 1 --json '{"order_index": 2, "action": "deny"}'
//! fireflow rule list --firewall 1 --policy 1 --sort-by order_index --size 10
//! fireflow rule delete --firewall 1 --policy 1 3
//! fireflow status
//! fireflow config init
//! ```

use clap::{Args, Parser, Subcommand};
use fireflow::audit::AuditLog;
use fireflow::config::{self, AppConfig};
use fireflow::core::error::{Error, Result, StatusClass, ValidationError, translate};
use fireflow::core::firewall::{FirewallCandidate, PolicyCandidate, RuleCandidate};
use fireflow::core::pagination::{PageRequest, SortKey};
use fireflow::core::service::FirewallService;
use fireflow::core::store::Store;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fireflow")]
#[command(about = "Manage firewalls, filtering policies and ordered rules", long_about = None)]
struct Cli {
    /// Database file (overrides config and FIREFLOW_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage firewalls
    #[command(subcommand)]
    Firewall(FirewallCommand),
    /// Manage filtering policies of a firewall
    #[command(subcommand)]
    Policy(PolicyCommand),
    /// Manage the ordered rules of a policy
    #[command(subcommand)]
    Rule(RuleCommand),
    /// Check the database and show row counts
    Status,
    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum FirewallCommand {
    Create {
        #[arg(long)]
        name: String,
        /// production, staging or development
        #[arg(long)]
        environment: String,
        #[arg(long)]
        scope: String,
        #[arg(long)]
        description: Option<String>,
    },
    List(PageArgs),
    Get { id: i64 },
    /// Delete a firewall with all of its policies and rules
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum PolicyCommand {
    Create {
        #[arg(long)]
        firewall: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Lower is evaluated first (default 100)
        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,
        /// allow, deny or log
        #[arg(long)]
        action: Option<String>,
        /// active or inactive
        #[arg(long)]
        status: Option<String>,
    },
    List {
        #[arg(long)]
        firewall: i64,
        #[command(flatten)]
        page: PageArgs,
    },
    Get {
        #[arg(long)]
        firewall: i64,
        id: i64,
    },
    /// Delete a policy with all of its rules
    Delete {
        #[arg(long)]
        firewall: i64,
        id: i64,
    },
}

#[derive(Args)]
struct PolicyScope {
    #[arg(long)]
    firewall: i64,
    #[arg(long)]
    policy: i64,
}

#[derive(Subcommand)]
enum RuleCommand {
    Create {
        #[command(flatten)]
        scope: PolicyScope,
        #[command(flatten)]
        rule: RuleArgs,
    },
    List {
        #[command(flatten)]
        scope: PolicyScope,
        #[command(flatten)]
        page: PageArgs,
    },
    Get {
        #[command(flatten)]
        scope: PolicyScope,
        id: i64,
    },
    Delete {
        #[command(flatten)]
        scope: PolicyScope,
        id: i64,
    },
}

/// Rule fields, either as flags or as one JSON document
#[derive(Args)]
struct RuleArgs {
    /// Candidate rule as JSON (same field names as the flags)
    #[arg(
        long,
        conflicts_with_all = [
            "order_index", "source_cidr", "destination_cidr", "protocol",
            "source_port_minimum", "source_port_maximum",
            "destination_port_minimum", "destination_port_maximum", "action",
        ]
    )]
    json: Option<String>,
    /// Position within the policy; lower is evaluated first
    #[arg(long, required_unless_present = "json", allow_negative_numbers = true)]
    order_index: Option<i64>,
    #[arg(long)]
    source_cidr: Option<String>,
    #[arg(long)]
    destination_cidr: Option<String>,
    /// tcp or udp (default tcp)
    #[arg(long)]
    protocol: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    source_port_minimum: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    source_port_maximum: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    destination_port_minimum: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    destination_port_maximum: Option<i64>,
    /// allow, deny or reject (default allow)
    #[arg(long)]
    action: Option<String>,
}

impl RuleArgs {
    fn candidate(self) -> Result<RuleCandidate> {
        if let Some(json) = self.json {
            return serde_json::from_str(&json).map_err(|e| Error::MalformedInput(e.to_string()));
        }
        Ok(RuleCandidate {
            order_index: self.order_index.unwrap_or_default(),
            source_cidr: self.source_cidr,
            destination_cidr: self.destination_cidr,
            protocol: self.protocol,
            source_port_minimum: self.source_port_minimum,
            source_port_maximum: self.source_port_maximum,
            destination_port_minimum: self.destination_port_minimum,
            destination_port_maximum: self.destination_port_maximum,
            action: self.action,
        })
    }
}

#[derive(Args)]
struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Items per page, 1 to 100 (default from config)
    #[arg(long)]
    size: Option<u32>,
    #[arg(long)]
    sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    sort_dir: Option<String>,
}

impl PageArgs {
    fn request<K: SortKey>(&self, default_size: u32) -> std::result::Result<PageRequest<K>, ValidationError> {
        PageRequest::new(self.page, self.size.unwrap_or(default_size))?
            .with_sort_text(self.sort_by.as_deref(), self.sort_dir.as_deref())
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let _ = fireflow::utils::ensure_dirs();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let mut config = config::load_config().await;
        if let Some(path) = cli.database {
            config.database_path = Some(path);
        }
        init_logging(&config);

        match handle_cli(cli.command, &config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report(&e);
                ExitCode::FAILURE
            }
        }
    })
}

fn init_logging(config: &AppConfig) {
    let builder = tracing_subscriber::fmt().with_max_level(config.log_level());

    if config.log_to_file
        && let Some(mut log_path) = fireflow::utils::get_state_dir()
    {
        log_path.push("fireflow.log");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            Ok(file) => {
                builder
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => eprintln!("Warning: cannot open {}: {e}", log_path.display()),
        }
    }

    builder.with_writer(std::io::stderr).init();
}

fn report(err: &Error) {
    let translation = translate(err);
    eprintln!(
        "Error: {} ({} {})",
        translation.message,
        translation.status.code(),
        translation.status
    );
    if let Some(details) = translation.details {
        eprintln!("  {details}");
    } else if translation.status == StatusClass::Internal {
        eprintln!("  {err}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_service(config: &AppConfig) -> Result<FirewallService> {
    let path = config.database_path().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Data directory not found; pass --database",
        ))
    })?;
    let store = Store::open(&path, config.busy_timeout())?;

    let service = FirewallService::new(store);
    if !config.audit_enabled {
        return Ok(service);
    }
    match AuditLog::new() {
        Ok(audit) => {
            tracing::debug!("Audit log at {}", audit.path().display());
            Ok(service.with_audit(audit))
        }
        Err(e) => {
            tracing::warn!("Audit log disabled: {}", e);
            Ok(service)
        }
    }
}

async fn handle_cli(command: Commands, config: &AppConfig) -> Result<()> {
    if let Commands::Config(command) = command {
        return handle_config(command, config).await;
    }

    let service = open_service(config)?;
    let page_size = config.page_size();

    match command {
        Commands::Firewall(command) => match command {
            FirewallCommand::Create {
                name,
                environment,
                scope,
                description,
            } => {
                let candidate = FirewallCandidate {
                    name,
                    environment,
                    scope,
                    description,
                };
                print_json(&service.create_firewall(&candidate).await?)
            }
            FirewallCommand::List(page) => {
                print_json(&service.list_firewalls(&page.request(page_size)?)?)
            }
            FirewallCommand::Get { id } => print_json(&service.get_firewall(id)?),
            FirewallCommand::Delete { id } => {
                let deleted = service.delete_firewall(id).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
        },
        Commands::Policy(command) => match command {
            PolicyCommand::Create {
                firewall,
                name,
                description,
                priority,
                action,
                status,
            } => {
                let candidate = PolicyCandidate {
                    name,
                    description,
                    priority,
                    action,
                    status,
                };
                print_json(&service.create_policy(firewall, &candidate).await?)
            }
            PolicyCommand::List { firewall, page } => {
                print_json(&service.list_policies(firewall, &page.request(page_size)?)?)
            }
            PolicyCommand::Get { firewall, id } => print_json(&service.get_policy(firewall, id)?),
            PolicyCommand::Delete { firewall, id } => {
                let deleted = service.delete_policy(firewall, id).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
        },
        Commands::Rule(command) => match command {
            RuleCommand::Create { scope, rule } => {
                let candidate = rule.candidate()?;
                print_json(
                    &service
                        .create_rule(scope.firewall, scope.policy, &candidate)
                        .await?,
                )
            }
            RuleCommand::List { scope, page } => print_json(&service.list_rules(
                scope.firewall,
                scope.policy,
                &page.request(page_size)?,
            )?),
            RuleCommand::Get { scope, id } => {
                print_json(&service.get_rule(scope.firewall, scope.policy, id)?)
            }
            RuleCommand::Delete { scope, id } => {
                let deleted = service.delete_rule(scope.firewall, scope.policy, id).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
        },
        Commands::Status => {
            let counts = service.status()?;
            print_json(&serde_json::json!({
                "status": "ok",
                "database": config.database_path(),
                "counts": counts,
            }))
        }
        Commands::Config(_) => Ok(()),
    }
}

async fn handle_config(command: ConfigCommand, config: &AppConfig) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let audit_log = config
                .audit_enabled
                .then(AuditLog::new)
                .and_then(std::result::Result::ok)
                .map(|audit| audit.path().to_path_buf());
            print_json(&serde_json::json!({
                "path": config::config_path(),
                "config": config,
                "database": config.database_path(),
                "audit_log": audit_log,
            }))
        }
        ConfigCommand::Init { force } => {
            let path = config::config_path().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Data directory not found",
                ))
            })?;
            if path.exists() && !force {
                println!("Config already exists at {} (use --force)", path.display());
                return Ok(());
            }
            config::save_config_to(&AppConfig::default(), &path).await?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
