//! dayflow CLI: journaling, summaries and daily plans against the local encrypted store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dayflow_core::{
    current_streak, AiPlan, AiPlanner, BehaviorSummarizer, ChatCompletionClient, DayflowConfig,
    EncryptionService, NewTask, RecordStore, SessionManager, SignInProfile, SledRecordStore,
    TaskCategory, Tracker, UserConfig,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "dayflow", version, about = "Private daily planner")]
struct Cli {
    /// Identity-provider subject of the user to act as.
    #[arg(long, global = true, env = "DAYFLOW_USER", default_value = "local")]
    user: String,

    /// Overrides DAYFLOW_DATA_PATH.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the user config file (API key, model).
    #[arg(long, global = true, default_value = "dayflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the anonymized behavior summary.
    Summary {
        /// Look-back window in days.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Print the exact payload the planner would send to the model.
    RequestData,

    /// Show today's plan, generating it when none is cached.
    Plan {
        /// Regenerate even if a plan for today exists.
        #[arg(long)]
        refresh: bool,
    },

    /// List tasks and today's reflection.
    Today,

    /// Add a task.
    AddTask {
        #[arg(long)]
        title: String,

        /// work, personal, health, learning or other.
        #[arg(long, default_value = "other")]
        category: TaskCategory,

        /// Scheduled time, e.g. "09:30".
        #[arg(long)]
        at: Option<String>,
    },

    /// Toggle a task's completion.
    CompleteTask {
        /// Task id as printed by `today`.
        id: String,
    },

    /// Record today's reflection.
    Reflect {
        /// 1 (low) to 5 (high).
        #[arg(long)]
        mood: u8,

        #[arg(long, default_value = "")]
        text: String,
    },

    /// Show the current daily-tasks streak.
    Streak,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = DayflowConfig::from_env();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_path = dir;
    }
    let user_config = UserConfig::load_from_path(&cli.config)?;

    let store: Arc<dyn RecordStore> = Arc::new(SledRecordStore::open_path(&config.data_path)?);
    let vault = Arc::new(EncryptionService::new());
    let sessions = SessionManager::new(store.clone(), vault.clone());
    let user = sessions.sign_in(&cli.user, SignInProfile::default()).await?;
    tracing::debug!(target: "dayflow::cli", user = %user.id, data = %config.data_path.display(), "session ready");

    let tracker = Tracker::new(store.clone(), vault.clone());
    let summarizer = Arc::new(
        BehaviorSummarizer::new(store.clone(), vault.clone()).with_window_days(config.summary_days),
    );

    match cli.command {
        Commands::Summary { days } => {
            let data = summarizer
                .generate_summary(&user.id, days.unwrap_or(config.summary_days))
                .await;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::RequestData => {
            println!("{}", summarizer.prepare_ai_request_data(&user.id).await);
        }
        Commands::Plan { refresh } => {
            let completion = Arc::new(ChatCompletionClient::from_config(&config, &user_config));
            let planner = AiPlanner::with_summarizer(summarizer, store.clone(), vault.clone(), completion)
                .with_templates(config.template_selection.selector());
            let cached = if refresh {
                None
            } else {
                planner.get_today_plan(&user.id).await
            };
            let plan = match cached {
                Some(plan) => plan,
                None => planner.generate_daily_plan(&user.id).await,
            };
            print_plan(&plan);
        }
        Commands::Today => {
            let today = chrono::Utc::now().date_naive();
            for task in tracker.tasks_for_user(&user.id).await? {
                if task.created_at.date_naive() != today && task.completed {
                    continue;
                }
                let title = tracker
                    .decrypt_task_title(&task)
                    .unwrap_or_else(|_| "(unreadable)".to_string());
                let mark = if task.completed { "x" } else { " " };
                let at = task.scheduled_time.as_deref().unwrap_or("--:--");
                println!("[{}] {} {:<9} {}  {}", mark, at, task.category, title, task.id);
            }
            if let Some(reflection) = tracker.today_reflection(&user.id).await? {
                let payload = tracker.decrypt_reflection(&reflection)?;
                println!("\nmood {}/5: {}", payload.mood, payload.text);
            }
        }
        Commands::AddTask { title, category, at } => {
            let mut new = NewTask::new(title, category);
            new.scheduled_time = at;
            let task = tracker.add_task(&user.id, new).await?;
            println!("{}", task.id);
        }
        Commands::CompleteTask { id } => {
            let task = tracker.toggle_task_completion(&user.id, &id).await?;
            println!("{} {}", task.id, if task.completed { "done" } else { "reopened" });
        }
        Commands::Reflect { mood, text } => {
            tracker.add_reflection(&user.id, mood, &text).await?;
        }
        Commands::Streak => {
            println!("{}", current_streak(store.as_ref(), &user.id).await?);
        }
    }

    sessions.sign_out();
    Ok(())
}

fn print_plan(plan: &AiPlan) {
    println!("Focus: {}\n", plan.focus_area);
    for (i, task) in plan.tasks.iter().enumerate() {
        match &task.estimated_time {
            Some(t) => println!("{}. [{}] {} ({})", i + 1, task.category, task.title, t),
            None => println!("{}. [{}] {}", i + 1, task.category, task.title),
        }
        if !task.reason.is_empty() {
            println!("   {}", task.reason);
        }
    }
    println!();
    for insight in &plan.insights {
        println!("* {}", insight);
    }
    println!("\n\"{}\"", plan.motivational_quote);
}
