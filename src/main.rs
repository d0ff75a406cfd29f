use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use voice_interview::api::{ResumeParser, ResumeUpload};
use voice_interview::session::{NoticeLevel, Phase, SessionHandle, SessionSnapshot};
use voice_interview::{
    create_router, ApiClient, AppState, CandidateProfile, Config, ConsoleSpeech,
    InterviewController, InterviewStore, JsonFileStore, NoSpeech, ParsedResume, SpeechOutput,
    SpeechRelay,
};

#[derive(Parser)]
#[command(name = "voice-interview", version, about = "AI-assisted voice interview sessions")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(short, long, default_value = "config/voice-interview")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API for a browser front-end
    Serve,

    /// Run an interview in the terminal
    Run {
        /// Parsed resume JSON (see `parse-resume`)
        #[arg(long)]
        resume: PathBuf,

        /// Do not simulate reading questions aloud
        #[arg(long)]
        no_speech: bool,
    },

    /// Send a resume file to the ML service and print the parsed JSON
    ParseResume {
        file: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List saved interviews
    List,

    /// Print a saved interview
    Show { session_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);
    info!("ML service: {}", cfg.api.base_url);

    let store: Arc<dyn InterviewStore> = Arc::new(JsonFileStore::new(&cfg.storage.interviews_path));

    match cli.command {
        Commands::Serve => serve(&cfg, store).await,
        Commands::Run { resume, no_speech } => run_console(&cfg, store, resume, no_speech).await,
        Commands::ParseResume { file, out } => parse_resume(&cfg, file, out).await,
        Commands::List => list_interviews(store).await,
        Commands::Show { session_id } => show_interview(store, session_id).await,
    }
}

fn api_client(cfg: &Config) -> Result<Arc<ApiClient>> {
    let client = ApiClient::new(&cfg.api.base_url, Duration::from_secs(cfg.api.timeout_secs))
        .context("Failed to build ML service client")?;
    Ok(Arc::new(client))
}

async fn serve(cfg: &Config, store: Arc<dyn InterviewStore>) -> Result<()> {
    let service = api_client(cfg)?;
    if let Err(e) = service.health().await {
        warn!("ML service health check failed: {}", e);
    }

    let relay = SpeechRelay::new();
    let (controller, session) = InterviewController::new(
        cfg.interview.clone(),
        service.clone(),
        Arc::new(relay.clone()),
        Arc::new(relay.clone()),
        Arc::clone(&store),
    );
    let controller_task = tokio::spawn(controller.run());

    let app = create_router(AppState::new(session.clone(), relay, store, service));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    let _ = session.shutdown().await;
    let _ = controller_task.await;
    Ok(())
}

async fn run_console(
    cfg: &Config,
    store: Arc<dyn InterviewStore>,
    resume_path: PathBuf,
    no_speech: bool,
) -> Result<()> {
    let json = tokio::fs::read(&resume_path)
        .await
        .with_context(|| format!("Failed to read {}", resume_path.display()))?;
    let resume: ParsedResume =
        serde_json::from_slice(&json).context("Resume file is not a parsed resume JSON")?;

    let speech: Arc<dyn SpeechOutput> = if no_speech {
        Arc::new(NoSpeech)
    } else {
        Arc::new(ConsoleSpeech::new())
    };
    let relay = SpeechRelay::new();

    let (controller, session) = InterviewController::new(
        cfg.interview.clone(),
        api_client(cfg)?,
        speech,
        Arc::new(relay.clone()),
        store,
    );
    let controller_task = tokio::spawn(controller.run());

    tokio::spawn(print_notices(session.clone()));
    tokio::spawn(print_phases(session.clone()));

    session.set_profile(resume).await?;
    println!("Generating questions...");
    if let Err(e) = session.start().await {
        println!("❌ {}", e);
        let _ = session.shutdown().await;
        let _ = controller_task.await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = session.wait_for(|s| s.phase == Phase::Completed) => break,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();

        let result = match (session.snapshot().phase, line) {
            (_, "q") => break,
            (Phase::Recording, "") => session.stop_recording().await,
            (Phase::Recording, "/skip") => session.skip().await,
            (Phase::Recording, text) => {
                relay.append_interim(text).await;
                Ok(())
            }
            (_, "r") => session.start_recording().await,
            (_, "s") => session.skip().await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            println!("⚠️  {}", e);
        }
    }

    let snapshot = session.snapshot();
    if let Some(result) = &snapshot.result {
        println!("\n🏆 Overall score: {}/100", result.overall_score);
        println!("{}", result.summary);
    }

    let _ = session.shutdown().await;
    let _ = controller_task.await;
    Ok(())
}

async fn print_notices(session: SessionHandle) {
    let mut notices = session.subscribe_notices();
    while let Ok(notice) = notices.recv().await {
        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        println!("{} {}", icon, notice.message);
    }
}

async fn print_phases(session: SessionHandle) {
    let mut snapshots = session.watch();
    let mut last = Phase::Idle;
    while snapshots.changed().await.is_ok() {
        let snapshot: SessionSnapshot = snapshots.borrow_and_update().clone();
        if snapshot.phase == last {
            continue;
        }
        last = snapshot.phase;

        match snapshot.phase {
            Phase::Reading => println!(
                "\nQuestion {}/{}",
                snapshot.current_question_index + 1,
                snapshot.total_questions
            ),
            Phase::WaitingToStart => println!(
                "You have {}s to start. [r] record  [s] skip  [q] quit",
                snapshot.time_remaining_secs
            ),
            Phase::Recording => println!(
                "🎙️  Recording ({}s). Type your answer, empty line to submit, /skip to skip",
                snapshot.time_remaining_secs
            ),
            Phase::Scoring => println!("\nScoring your answers..."),
            _ => {}
        }
    }
}

async fn parse_resume(cfg: &Config, file: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let client = api_client(cfg)?;
    let upload = ResumeUpload::from_path(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let resume = client
        .parse_resume(upload)
        .await
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let missing = CandidateProfile::from_resume(&resume).missing_fields();
    if !missing.is_empty() {
        warn!("Resume is missing mandatory fields: {}", missing.join(", "));
    }
    let json = serde_json::to_string_pretty(&resume)?;

    match out {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Parsed resume written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn list_interviews(store: Arc<dyn InterviewStore>) -> Result<()> {
    let summaries = store.list().await?;
    if summaries.is_empty() {
        println!("No saved interviews");
        return Ok(());
    }

    for s in summaries {
        println!(
            "{}  {:<24} {:<16} {:>3}/100  {} questions  {}",
            s.session_id,
            s.candidate_name,
            s.technology,
            s.overall_score,
            s.questions,
            s.completed_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn show_interview(store: Arc<dyn InterviewStore>, session_id: Uuid) -> Result<()> {
    let record = store
        .load(session_id)
        .await?
        .with_context(|| format!("Interview {} not found", session_id))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
