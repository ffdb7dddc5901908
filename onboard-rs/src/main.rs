//! onboard: command line driver for the onboarding engine
//!
//! # Usage
//!
//! ```bash
//! # Look up departments or locations
//! onboard search department eng
//! onboard search location jak
//!
//! # Next employee ID for a department
//! onboard employee-id "Human Resources"
//!
//! # List employees
//! onboard employees --page 2 --limit 10
//!
//! # Submit a draft file, or manage the stored draft
//! onboard --role admin submit --draft draft.json
//! onboard --role ops draft show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use onboard_rs::api::{Department, OnboardApi, ReqwestBackend};
use onboard_rs::draft::{DraftStorage, EmployeeDraft, FileStorage};
use onboard_rs::employee_id::EmployeeIdTracker;
use onboard_rs::employees::{fetch_employees, Pagination};
use onboard_rs::search::options::{department_search, location_search};
use onboard_rs::search::ListView;
use onboard_rs::{OnboardConfig, Role, SubmissionPipeline, SubmitOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Employee onboarding wizard engine", long_about = None)]
struct Cli {
    /// TOML configuration file (ONBOARD__* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wizard role
    #[arg(short, long, default_value = "ops")]
    role: Role,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Picker {
    Department,
    Location,
}

#[derive(Subcommand)]
enum Commands {
    /// Search departments or locations
    Search {
        picker: Picker,
        /// Text typed into the picker
        text: String,
    },
    /// Compute the next employee ID for a department
    EmployeeId {
        /// Department name
        department: String,
    },
    /// List employees
    Employees {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Submit a draft JSON file
    Submit {
        #[arg(long)]
        draft: PathBuf,
    },
    /// Inspect or clear the stored draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    Show,
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onboard_rs=info,onboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = OnboardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(
        "Using backends {} and {}",
        config.api.basic_info_base_url, config.api.details_base_url
    );

    let backend = Arc::new(ReqwestBackend::new(Duration::from_secs(
        config.api.timeout_seconds,
    ))?);
    let api = OnboardApi::new(backend, &config.api);

    match cli.command {
        Commands::Search { picker, text } => {
            let (labels, view) = match picker {
                Picker::Department => {
                    let engine = department_search(&api, &config.search);
                    engine.search_now(&text).await;
                    let state = engine.snapshot().await;
                    let labels: Vec<String> = state
                        .options
                        .iter()
                        .map(|d| match &d.head {
                            Some(head) => format!("{} (head: {})", d.name, head),
                            None => d.name.clone(),
                        })
                        .collect();
                    (labels, engine.list_view().await)
                }
                Picker::Location => {
                    let engine = location_search(&api, &config.search);
                    engine.search_now(&text).await;
                    let state = engine.snapshot().await;
                    let labels: Vec<String> = state
                        .options
                        .iter()
                        .map(|l| format!("{}, {}", l.city, l.country))
                        .collect();
                    (labels, engine.list_view().await)
                }
            };

            match view {
                ListView::NoResults => println!("No results found"),
                ListView::Hidden if labels.is_empty() => {
                    println!("Type at least {} character(s)", config.search.min_chars)
                }
                _ => {
                    for (i, label) in labels.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, label);
                    }
                }
            }
        }
        Commands::EmployeeId { department } => {
            let found: Vec<Department> = api
                .search(&api.departments_url(), "name", &department)
                .await?;
            let Some(selected) = found
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(&department))
                .or_else(|| found.first())
            else {
                eprintln!("Error: No department matches '{}'", department);
                std::process::exit(1);
            };

            let tracker = EmployeeIdTracker::new(api.clone());
            let employee_id = tracker.department_changed(Some(selected)).await;
            if employee_id.is_empty() {
                eprintln!("Error: Could not compute an employee ID for {}", selected.name);
                std::process::exit(1);
            }
            println!("{} -> {}", selected.name, employee_id);
        }
        Commands::Employees { page, limit } => {
            let result = fetch_employees(&api, page, limit).await?;
            let pager = Pagination::new(page, limit, result.total);

            if result.records.is_empty() {
                println!("No employees found.");
            } else {
                println!(
                    "{:<12} {:<24} {:<20} {:<8} {:<16} {:<6}",
                    "Employee ID", "Name", "Department", "Role", "Location", "Photo"
                );
                println!("{:-<90}", "");
                for record in &result.records {
                    println!(
                        "{:<12} {:<24} {:<20} {:<8} {:<16} {:<6}",
                        record.employee_id,
                        record.full_name,
                        record.department,
                        record.role,
                        record.location,
                        if record.photo.is_some() { "yes" } else { "-" }
                    );
                }
            }
            println!(
                "\nPage {} of {} ({} total){}{}",
                pager.page,
                pager.total_pages(),
                pager.total,
                if pager.can_prev() { "  [prev]" } else { "" },
                if pager.can_next() { "  [next]" } else { "" },
            );
        }
        Commands::Submit { draft } => {
            let raw = tokio::fs::read_to_string(&draft)
                .await
                .with_context(|| format!("Failed to read {}", draft.display()))?;
            let form: EmployeeDraft = serde_json::from_str(&raw)?;

            let pipeline = SubmissionPipeline::new(api, cli.role, &config.submission);
            let mut progress = pipeline.subscribe();
            let printer = tokio::spawn(async move {
                while let Ok(step) = progress.recv().await {
                    println!("  {}", step);
                }
            });

            let outcome = pipeline.submit(&form).await;
            drop(pipeline);
            if let Err(e) = printer.await {
                warn!("Progress printer stopped: {}", e);
            }

            match outcome {
                SubmitOutcome::Completed(receipt) => {
                    println!("✓ Employee {} submitted", receipt.employee_id);
                }
                SubmitOutcome::Invalid(errors) => {
                    for field in errors.fields() {
                        eprintln!("  {}: {}", field, errors.get(field).unwrap_or_default());
                    }
                    std::process::exit(1);
                }
                SubmitOutcome::Busy => {
                    eprintln!("Error: A submission is already running");
                    std::process::exit(1);
                }
                SubmitOutcome::Failed(message) => {
                    eprintln!("Error: {}", message);
                    std::process::exit(1);
                }
            }
        }
        Commands::Draft { action } => {
            let storage = FileStorage::new(config.draft.dir.clone());
            let key = cli.role.draft_key();
            match action {
                DraftAction::Show => match storage.read(&key).await? {
                    Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                    None => println!("No draft stored for {}", cli.role),
                },
                DraftAction::Clear => {
                    storage.remove(&key).await?;
                    println!("✓ Draft for {} cleared", cli.role);
                }
            }
        }
    }

    Ok(())
}
