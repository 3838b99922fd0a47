//! autocommit - CLI entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use autocommit::commit::{BatchOutcome, Orchestrator, classify};
use autocommit::config::Config;
use autocommit::error::SessionError;
use autocommit::git::{GitExecutor, SystemGit, check_git_installed};
use autocommit::history::{CommitLedger, CommitRecord, DEFAULT_RECENT_LIMIT};
use autocommit::session::{Session, SessionHandle};

/// Commit changes in a git working tree automatically.
#[derive(Parser, Debug)]
#[command(name = "autocommit")]
#[command(about = "Commit changes in a git working tree automatically")]
#[command(version)]
struct Cli {
    /// Repository to operate on
    #[arg(short = 'C', long = "repo", default_value = ".", global = true)]
    repo: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the working tree and commit each file after it settles
    Watch {
        /// Quiet period in seconds before a changed file is committed
        #[arg(long)]
        delay: Option<u64>,

        /// Push after every commit
        #[arg(long)]
        push: bool,

        /// Start without watching; type `enable` to begin
        #[arg(long)]
        paused: bool,
    },
    /// Commit all pending changes, one commit per category
    Commit {
        /// Push after committing
        #[arg(long)]
        push: bool,

        /// Print the planned commits without touching the repository
        #[arg(long)]
        dry_run: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the category and message each path would get
    Classify {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Classify { paths } => {
            classify_paths(&cli.repo, &paths).await;
            Ok(())
        }
        Command::Commit { push, dry_run, json } => {
            let (orchestrator, _) = open_repository(&cli.repo, None, push).await?;
            run_commit(&orchestrator, dry_run, json).await
        }
        Command::Watch { delay, push, paused } => {
            let (orchestrator, mut config) = open_repository(&cli.repo, delay, push).await?;
            config.enabled = !paused;
            run_watch(orchestrator, config).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "autocommit=debug" } else { "autocommit=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Locate the repository, load its config and apply CLI overrides.
async fn open_repository(
    repo: &Path,
    delay: Option<u64>,
    push: bool,
) -> Result<(Arc<Orchestrator<SystemGit>>, Config)> {
    check_git_installed().context("git is required")?;

    let root = SystemGit::new(repo)
        .repo_root()
        .await
        .with_context(|| format!("{} is not inside a git repository", repo.display()))?;

    let mut config = Config::load(&root).context("Failed to load configuration")?;
    if let Some(delay) = delay {
        config.delay_secs = delay;
    }
    if push {
        config.auto_push = true;
    }

    let executor = SystemGit::new(&root).with_remote(config.remote.clone());
    let orchestrator = Orchestrator::new(executor, Arc::new(CommitLedger::new()))
        .with_templates(config.template_table())
        .with_auto_push(config.auto_push);

    Ok((Arc::new(orchestrator), config))
}

async fn classify_paths(repo: &Path, paths: &[String]) {
    let root = SystemGit::new(repo).root_or_workdir().await;
    let templates = Config::load(&root)
        .map(|config| config.template_table())
        .unwrap_or_default();

    for path in paths {
        let category = classify(path);
        let message = templates.render(&category, path, None);
        println!("{:<14} {}", category.word(), message);
    }
}

async fn run_commit(orchestrator: &Orchestrator<SystemGit>, dry_run: bool, json: bool) -> Result<()> {
    if dry_run {
        let plan = orchestrator
            .plan_batch()
            .await
            .context("Failed to read pending changes")?;

        if json {
            let value: Vec<_> = plan
                .iter()
                .map(|planned| {
                    serde_json::json!({
                        "category": planned.category.word(),
                        "files": planned.files,
                        "message": planned.message,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else if plan.is_empty() {
            println!("Nothing to commit.");
        } else {
            for planned in &plan {
                println!("{}\n", planned.message);
            }
        }
        return Ok(());
    }

    let records = match orchestrator.commit_batch().await {
        Ok(BatchOutcome::NothingToCommit) => Vec::new(),
        Ok(BatchOutcome::Committed(records)) => records,
        Err(e) => {
            // Commits made before a failed push still exist.
            print_records(e.committed(), json)?;
            return Err(e).context("Batch commit failed");
        }
    };

    if records.is_empty() && !json {
        println!("Nothing to commit.");
        return Ok(());
    }
    print_records(&records, json)
}

fn print_records(records: &[CommitRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        for record in records {
            println!("✓ {}", record.summary());
        }
    }
    Ok(())
}

async fn run_watch(orchestrator: Arc<Orchestrator<SystemGit>>, config: Config) -> Result<()> {
    let root = orchestrator.executor().workdir().to_path_buf();
    let (session, handle) =
        Session::new(orchestrator, &root, &config).context("Failed to set up watching")?;
    let session = tokio::spawn(session.run());

    println!("Commands: enable, disable, batch, history [N], clear, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&handle, line.trim()).await {
                        break;
                    }
                }
                // stdin closed: keep watching until Ctrl-C
                Ok(None) => {
                    tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C")?;
                    break;
                }
                Err(e) => return Err(e).context("Failed to read stdin"),
            },
        }
    }

    println!("Finishing in-flight commits...");
    handle.shutdown().context("Session already stopped")?;
    session.await.context("Session task failed")?;
    Ok(())
}

/// Run one interactive command. Returns false on `quit`.
async fn handle_line(handle: &SessionHandle, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return true;
    };

    match command {
        "enable" => match handle.enable().await {
            Ok(()) => println!("Watching."),
            Err(e) => eprintln!("Error: {}", e),
        },
        "disable" => match handle.disable().await {
            Ok(cancelled) => println!("Paused ({} pending change(s) dropped).", cancelled),
            Err(e) => eprintln!("Error: {}", e),
        },
        "batch" => match handle.batch_commit().await {
            Ok(BatchOutcome::NothingToCommit) => println!("Nothing to commit."),
            Ok(BatchOutcome::Committed(records)) => {
                for record in &records {
                    println!("✓ {}", record.summary());
                }
            }
            Err(SessionError::Commit(e)) => {
                for record in e.committed() {
                    println!("✓ {}", record.summary());
                }
                eprintln!("Error: {}", e);
            }
            Err(e) => eprintln!("Error: {}", e),
        },
        "history" => {
            let limit = match words.next().map(str::parse::<usize>) {
                None => DEFAULT_RECENT_LIMIT,
                Some(Ok(limit)) => limit,
                Some(Err(_)) => {
                    eprintln!("Usage: history [N]");
                    return true;
                }
            };
            print_history(&handle.history(limit));
        }
        "clear" => {
            handle.clear_history();
            println!("History cleared.");
        }
        "quit" | "exit" => return false,
        other => eprintln!("Unknown command '{}'", other),
    }

    true
}

fn print_history(records: &[CommitRecord]) {
    if records.is_empty() {
        println!("No commits yet.");
        return;
    }

    for record in records {
        println!(
            "{}  {}  ({})",
            record.timestamp.format("%H:%M:%S"),
            record.summary(),
            record.files.join(", ")
        );
    }
}
