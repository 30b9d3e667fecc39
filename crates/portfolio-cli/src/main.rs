//! Portfolio CLI - project portfolio management

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use portfolio_core::config::Config;
use portfolio_core::domain::members::{
    HttpMemberDirectory, MemberDirectory, StaticMemberDirectory,
};
use portfolio_core::domain::projects::{
    ProjectCreate, ProjectListQuery, ProjectService, ProjectUpdate, ProjectView,
    SqliteProjectRepository,
};
use portfolio_core::domain::reports::ReportService;
use portfolio_core::storage::{Database, DatabaseConfig};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "portfolio")]
#[command(author, version, about = "Project portfolio management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Database file path (overrides config)
    #[arg(long, global = true)]
    db: Option<std::path::PathBuf>,

    /// Member directory base URL (overrides config; unset uses the
    /// built-in roster)
    #[arg(long, global = true)]
    directory_url: Option<String>,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Portfolio reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Forecast end date (YYYY-MM-DD)
        #[arg(long)]
        forecast_end: NaiveDate,
        /// Total budget in cents
        #[arg(long)]
        budget_cents: i64,
        /// Manager member id
        #[arg(long)]
        manager: i64,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Starting status (defaults to under_review)
        #[arg(long)]
        status: Option<String>,
    },
    /// Show project details
    Get { id: Uuid },
    /// List projects
    List {
        /// Filter by name substring
        #[arg(long)]
        name: Option<String>,
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by manager id
        #[arg(long)]
        manager: Option<i64>,
        /// Earliest start date (YYYY-MM-DD)
        #[arg(long)]
        start_from: Option<NaiveDate>,
        /// Latest start date (YYYY-MM-DD)
        #[arg(long)]
        start_to: Option<NaiveDate>,
        /// Page number (zero-based)
        #[arg(long)]
        page: Option<u32>,
        /// Page size
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Update project fields
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        forecast_end: Option<NaiveDate>,
        /// Actual end date; pass "none" to clear it
        #[arg(long)]
        actual_end: Option<String>,
        #[arg(long)]
        budget_cents: Option<i64>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        manager: Option<i64>,
    },
    /// Move a project to a new status
    Status {
        id: Uuid,
        /// Target status
        status: String,
    },
    /// Delete a project
    Delete { id: Uuid },
    /// Allocate members to a project
    Allocate {
        id: Uuid,
        /// Member ids (1 to 10)
        #[arg(required = true)]
        members: Vec<i64>,
    },
    /// Remove a member from a project
    Deallocate { id: Uuid, member: i64 },
    /// List a project's allocated members
    Members { id: Uuid },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Portfolio-wide summary
    Summary,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portfolio=info".parse()?),
        )
        .init();

    let Cli {
        command,
        format,
        db,
        directory_url,
    } = Cli::parse();
    let config = Config::load()?;

    match command {
        Commands::Project { action } => {
            let service = build_service(db, directory_url, &config).await?;
            cmd_project(&service, action, format).await
        }

        Commands::Report { action } => {
            let db = open_database(db, &config).await?;
            let repository = Arc::new(SqliteProjectRepository::new(db.pool().clone()));
            cmd_report(&ReportService::new(repository), action, format).await
        }

        Commands::Config { action } => cmd_config(action),

        Commands::Doctor => {
            let db = open_database(db, &config).await?;
            cmd_doctor(&db).await
        }
    }
}

async fn open_database(
    path_override: Option<std::path::PathBuf>,
    config: &Config,
) -> anyhow::Result<Database> {
    let path = path_override.unwrap_or_else(|| config.database.path.clone());
    Database::new(DatabaseConfig::with_path(path)).await
}

async fn build_service(
    path_override: Option<std::path::PathBuf>,
    directory_url: Option<String>,
    config: &Config,
) -> anyhow::Result<ProjectService> {
    let db = open_database(path_override, config).await?;
    let repository = Arc::new(SqliteProjectRepository::new(db.pool().clone()));

    let url = directory_url
        .filter(|u| !u.is_empty())
        .or_else(|| {
            (!config.directory.base_url.is_empty()).then(|| config.directory.base_url.clone())
        });
    let directory: Arc<dyn MemberDirectory> = match url {
        Some(url) => Arc::new(HttpMemberDirectory::with_timeout(
            url,
            std::time::Duration::from_secs(config.directory.timeout_secs),
        )?),
        None => Arc::new(StaticMemberDirectory::with_sample_members()),
    };

    Ok(ProjectService::new(repository, directory))
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_project(
    service: &ProjectService,
    action: ProjectAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        ProjectAction::Create {
            name,
            start,
            forecast_end,
            budget_cents,
            manager,
            description,
            status,
        } => {
            let view = service
                .create(ProjectCreate {
                    name,
                    start_date: start,
                    forecast_end_date: forecast_end,
                    actual_end_date: None,
                    total_budget_cents: budget_cents,
                    description,
                    manager_id: manager,
                    status,
                })
                .await?;
            print_project(&view, format)?;
        }

        ProjectAction::Get { id } => {
            let view = service.get(id).await?;
            print_project(&view, format)?;
        }

        ProjectAction::List {
            name,
            status,
            manager,
            start_from,
            start_to,
            page,
            per_page,
        } => {
            let result = service
                .list(ProjectListQuery {
                    name,
                    status,
                    manager_id: manager,
                    start_date_from: start_from,
                    start_date_to: start_to,
                    page,
                    per_page,
                })
                .await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.items)?),
                OutputFormat::Text => {
                    if result.items.is_empty() {
                        println!("No projects found.");
                    } else {
                        println!(
                            "Projects (page {}, {} of {} total):",
                            result.page,
                            result.items.len(),
                            result.total
                        );
                        for p in &result.items {
                            println!(
                                "  {} - {} [{}] risk: {}, budget: {}",
                                p.id,
                                p.name,
                                p.status.label(),
                                p.risk_level.label(),
                                format_cents(p.total_budget_cents)
                            );
                        }
                    }
                }
            }
        }

        ProjectAction::Update {
            id,
            name,
            start,
            forecast_end,
            actual_end,
            budget_cents,
            description,
            manager,
        } => {
            let actual_end_date = match actual_end.as_deref() {
                None => None,
                Some("none") => Some(None),
                Some(s) => Some(Some(s.parse().map_err(|e| {
                    anyhow::anyhow!("Invalid actual end date '{s}': {e}")
                })?)),
            };
            let view = service
                .update(
                    id,
                    ProjectUpdate {
                        name,
                        start_date: start,
                        forecast_end_date: forecast_end,
                        actual_end_date,
                        total_budget_cents: budget_cents,
                        description,
                        manager_id: manager,
                        status: None,
                    },
                )
                .await?;
            print_project(&view, format)?;
        }

        ProjectAction::Status { id, status } => {
            let view = service.transition_status(id, &status).await?;
            print_project(&view, format)?;
        }

        ProjectAction::Delete { id } => {
            service.delete(id).await?;
            println!("Project {} deleted.", id);
        }

        ProjectAction::Allocate { id, members } => {
            let view = service.allocate_members(id, &members).await?;
            print_project(&view, format)?;
        }

        ProjectAction::Deallocate { id, member } => {
            service.deallocate_member(id, member).await?;
            println!("Member {} removed from project {}.", member, id);
        }

        ProjectAction::Members { id } => {
            let members = service.allocated_members(id).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&members)?),
                OutputFormat::Text => {
                    if members.is_empty() {
                        println!("No members allocated.");
                    } else {
                        for m in &members {
                            println!("  {} - {}", m.member_id, m.member_name);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

async fn cmd_report(
    reports: &ReportService,
    action: ReportAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        ReportAction::Summary => {
            let summary = reports.portfolio_summary().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => {
                    println!("Portfolio summary");
                    println!("  Projects by status:");
                    let mut statuses: Vec<_> = summary.projects_by_status.iter().collect();
                    statuses.sort();
                    for (label, count) in statuses {
                        println!(
                            "    {}: {} ({})",
                            label,
                            count,
                            format_cents(summary.budget_by_status[label])
                        );
                    }
                    println!(
                        "  Average closed project duration: {:.1} days",
                        summary.average_closed_duration_days
                    );
                    println!(
                        "  Unique members allocated: {}",
                        summary.unique_members_allocated
                    );
                }
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(db: &Database) -> anyhow::Result<()> {
    db.health_check().await?;
    println!("Database: OK ({})", db.path().display());

    let status = db.migration_status().await?;
    println!(
        "Migrations: version {} of {}{}",
        status.current_version,
        status.latest_version,
        if status.needs_migration {
            " (migration needed)"
        } else {
            ""
        }
    );
    Ok(())
}

fn print_project(view: &ProjectView, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Text => {
            println!("Project: {}", view.name);
            println!("  ID: {}", view.id);
            println!("  Status: {}", view.status.label());
            println!("  Risk: {}", view.risk_level.label());
            println!("  Budget: {}", format_cents(view.total_budget_cents));
            println!("  Start: {}", view.start_date);
            println!("  Forecast end: {}", view.forecast_end_date);
            if let Some(end) = view.actual_end_date {
                println!("  Actual end: {}", end);
            }
            println!("  Manager: {} ({})", view.manager_name, view.manager_id);
            if let Some(desc) = &view.description {
                println!("  Description: {}", desc);
            }
            if !view.allocated_members.is_empty() {
                println!("  Members:");
                for m in &view.allocated_members {
                    println!("    {} - {}", m.member_id, m.member_name);
                }
            }
        }
    }
    Ok(())
}

/// Format a cent amount as a decimal currency string
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
