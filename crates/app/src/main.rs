//! PanelPost - threaded comic posting for AT Protocol services
//!
//! Main entry point for the command-line client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use panelpost_app::commands::{self, PostRequest};
use panelpost_app::utils::logging::{init_tracing, log_command_execution};
use panelpost_app::AppContext;
use panelpost_domain::{at_uri_to_bsky_app_url, Result};
use panelpost_infra::config;

#[derive(Debug, Parser)]
#[command(name = "panelpost", version, about = "Post comic pages as threads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with an app password
    Login {
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "PANELPOST_APP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Start an OAuth sign-in and print the URL to open
    Authorize,
    /// Finish the OAuth sign-in from the redirect URL
    Callback { url: String },
    /// Show the signed-in account
    Whoami,
    /// Post a directory of pages as a thread, or schedule it with --at
    Post {
        dir: PathBuf,
        #[arg(long, default_value = "")]
        text: String,
        /// Per-post counter, e.g. "({i}/{n})"
        #[arg(long)]
        template: Option<String>,
        /// Alt text template, e.g. "{name} ({i}/{n})"
        #[arg(long)]
        alt_template: Option<String>,
        #[arg(long)]
        skip_blank: bool,
        /// RFC 3339 time to post at instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Manage scheduled threads
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Post scheduled threads as they come due, until interrupted
    RunScheduler,
    /// Forget all sessions
    SignOut,
}

#[derive(Debug, Subcommand)]
enum ScheduleAction {
    List,
    Cancel { id: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Authorize => "authorize",
            Self::Callback { .. } => "callback",
            Self::Whoami => "whoami",
            Self::Post { at: Some(_), .. } => "schedule_post",
            Self::Post { .. } => "post",
            Self::Schedule { action: ScheduleAction::List } => "schedule_list",
            Self::Schedule { action: ScheduleAction::Cancel { .. } } => "schedule_cancel",
            Self::RunScheduler => "run_scheduler",
            Self::SignOut => "sign_out",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Missing .env is normal
    let dotenv = dotenvy::dotenv().ok();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let context = Arc::new(AppContext::new_with_config(config).await?);

    let name = cli.command.name();
    let started = Instant::now();
    let outcome = dispatch(cli.command, context).await;
    log_command_execution(name, started.elapsed(), outcome.as_ref().err());
    Ok(outcome?)
}

#[allow(clippy::print_stdout)]
async fn dispatch(command: Command, context: Arc<AppContext>) -> Result<()> {
    match command {
        Command::Login { identifier, password } => {
            let session = commands::login(&context, &identifier, &password).await?;
            println!("Signed in as @{} ({})", session.handle, session.did);
        }
        Command::Authorize => {
            let url = commands::authorize(&context).await?;
            println!("Open this URL to sign in, then run `panelpost callback <redirect url>`:");
            println!("{url}");
        }
        Command::Callback { url } => match commands::complete_authorization(&context, &url).await? {
            Some(did) => println!("Signed in as {did}"),
            None => println!("That URL carries no authorization response"),
        },
        Command::Whoami => match commands::account_summary(&context) {
            Some(summary) => println!("{summary}"),
            None => println!("Not signed in"),
        },
        Command::Post { dir, text, template, alt_template, skip_blank, at } => {
            let request = PostRequest { dir, text, template, alt_template, skip_blank };
            match at {
                Some(at) => {
                    let entry = commands::schedule_post(&context, &request, at).await?;
                    println!("Scheduled \"{}\" for {} ({})", entry.title, entry.scheduled_at, entry.id);
                }
                None => {
                    let thread = commands::post_now(&context, &request).await?;
                    let link = at_uri_to_bsky_app_url(&thread.root_uri);
                    println!("Posted {} posts: {}", thread.uris.len(), link.unwrap_or(thread.root_uri));
                }
            }
        }
        Command::Schedule { action: ScheduleAction::List } => {
            let entries = commands::list_scheduled(&context).await?;
            if entries.is_empty() {
                println!("Nothing scheduled");
            }
            for entry in entries {
                println!(
                    "{}  {}  {} posts, {} images  {}",
                    entry.id,
                    entry.scheduled_at.to_rfc3339(),
                    entry.groups.len(),
                    entry.image_count(),
                    entry.title
                );
            }
        }
        Command::Schedule { action: ScheduleAction::Cancel { id } } => {
            commands::cancel_scheduled(&context, &id).await?;
            println!("Cancelled {id}");
        }
        Command::RunScheduler => {
            println!("Scheduler running; press Ctrl-C to stop");
            commands::run_scheduler(context, async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %err, "Failed to listen for Ctrl-C");
                }
            })
            .await?;
        }
        Command::SignOut => {
            commands::sign_out(&context).await?;
            println!("Signed out");
        }
    }
    Ok(())
}
