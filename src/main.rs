mod cli;

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::Parser;

use cli::{Cli, Commands};
use levelup_client::api::ApiClient;
use levelup_client::auth::session::needs_confirmation;
use levelup_client::auth::{CredentialStore, LibSqlCredentialStore, SessionService, TokenAuthGateway};
use levelup_client::calendar::{self, CalendarMarks};
use levelup_client::config::ClientConfig;
use levelup_client::dashboard::Dashboard;
use levelup_client::http::ReqwestTransport;
use levelup_client::tasks::TaskStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    // ── Wiring ──────────────────────────────────────────────────────
    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let credentials: Arc<dyn CredentialStore> = Arc::new(
        LibSqlCredentialStore::new_local(&config.credentials_path)
            .await
            .with_context(|| {
                format!(
                    "failed to open credential store at {}",
                    config.credentials_path.display()
                )
            })?,
    );
    let gateway = Arc::new(TokenAuthGateway::new(transport, credentials.clone()));
    let api = ApiClient::new(gateway);
    let session = SessionService::new(api.clone(), credentials);
    let dashboard = Dashboard::new(api, &config);

    match cli.command {
        Commands::Login { email, password } => {
            if let Err(e) = session.login(&email, &password).await {
                eprintln!("{}", e.user_message("Login failed"));
                if needs_confirmation(&e) {
                    eprintln!("Your email is not confirmed yet. Check your inbox for the confirmation link.");
                }
                std::process::exit(1);
            }
            println!("Logged in as {email}");
        }
        Commands::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
        Commands::Status => {
            if !session.is_authenticated().await? {
                println!("Not logged in");
                return Ok(());
            }
            load(&dashboard, calendar::today()).await?;
            let state = dashboard.snapshot().await;
            println!("User:        {}", state.username.as_deref().unwrap_or("-"));
            println!(
                "Level:       {} ({}/{} XP, {:.0}%)",
                state.progression.level,
                state.progression.experience,
                state.progression.next_level_threshold,
                state.progression.progress_percentage()
            );
            println!(
                "Today:       {} tasks, {:.0}% done",
                state.tasks_due_today, state.daily_progress
            );
            for stat in state.editable_stats() {
                println!("  {:<12} {}", stat.name, stat.value);
            }
        }
        Commands::Tasks { date } => {
            let date = date.unwrap_or_else(calendar::today);
            load(&dashboard, date).await?;
            let state = dashboard.snapshot().await;
            let due = calendar::tasks_on(&state.tasks, date);
            if due.is_empty() {
                println!("No tasks on {date}");
            }
            for task in due {
                let time = task
                    .due_date
                    .as_deref()
                    .and_then(|d| calendar::format_due(d, "%H:%M"))
                    .unwrap_or_default();
                println!(
                    "{:>5}  [{}]  {:<5}  {}",
                    task.id,
                    if TaskStatus::of(task).is_terminal() { "x" } else { " " },
                    time,
                    task.title
                );
            }
        }
        Commands::Calendar => {
            load(&dashboard, calendar::today()).await?;
            let state = dashboard.snapshot().await;
            let marks = CalendarMarks::from_tasks(&state.tasks);
            let counts = calendar::count_by_date(&state.tasks);
            if counts.is_empty() {
                println!("No scheduled tasks");
            }
            for (day, count) in counts {
                let mark = match marks.mark(day) {
                    Some(true) => "done",
                    Some(false) => "pending",
                    None => "",
                };
                println!("{}  {:>3} tasks  {}", day.format("%d.%m.%Y"), count, mark);
            }
        }
        Commands::Complete { id } => {
            load(&dashboard, calendar::today()).await?;
            match dashboard.complete_task(id, true).await {
                Ok(outcome) if !outcome.changed => println!("Task {id} is already completed"),
                Ok(outcome) => {
                    println!(
                        "+{} XP. Level {} ({}/{} XP)",
                        outcome.reward,
                        outcome.progression.level,
                        outcome.progression.experience,
                        outcome.progression.next_level_threshold
                    );
                    if outcome.leveled_up {
                        println!("Level up!");
                    }
                    if !outcome.failed_stat_updates.is_empty() {
                        eprintln!(
                            "Warning: failed to update {}",
                            outcome.failed_stat_updates.join(", ")
                        );
                    }
                }
                Err(e) => bail!(e.user_message("Failed to update task")),
            }
        }
    }

    Ok(())
}

async fn load(dashboard: &Dashboard, today: NaiveDate) -> anyhow::Result<()> {
    if let Err(e) = dashboard.load_on(today).await {
        bail!(e.user_message("Failed to load data"));
    }
    Ok(())
}
