//! ask CLI: terminal chat client for a question-answering endpoint

use ask_engine::{
    default_data_dir, AskClient, ChatController, Config, FileStore, HistoryStore, HttpAskClient,
    CONFIG_FILE,
};
use ask_tui::App;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Chat with a question-answering endpoint from the terminal
#[derive(Parser)]
#[command(name = "ask")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Endpoint URL, overriding the config file
    #[arg(long, global = true, env = "ASK_API_URL")]
    api_url: Option<String>,

    /// Directory holding config, history and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// Ask one question and print the answer
    Send {
        /// The question (words are joined with spaces)
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Print the saved conversation
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the saved conversation
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check the endpoint and local setup
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Log file written in TUI mode, inside the data directory.
const LOG_FILE: &str = "ask.log";

/// Question sent by `doctor` to probe the endpoint.
const PROBE_QUESTION: &str = "Hello! Reply with a short greeting.";

type CliResult = Result<ExitCode, Box<dyn Error>>;

/// Resolved settings shared by all commands.
struct Context {
    data_dir: PathBuf,
    config: Config,
    endpoint: String,
}

impl Context {
    fn load(api_url: Option<&str>, data_dir: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir().ok_or("no data directory found, pass --data-dir")?,
        };
        let config = Config::load_or_default(&data_dir.join(CONFIG_FILE))?;
        let endpoint = config.endpoint_url(api_url)?;
        Ok(Self {
            data_dir,
            config,
            endpoint,
        })
    }

    fn history_path(&self) -> PathBuf {
        self.config.history_path(&self.data_dir)
    }

    fn client(&self) -> Result<HttpAskClient, Box<dyn Error>> {
        Ok(HttpAskClient::with_timeout(
            &self.endpoint,
            self.config.request_timeout(),
        )?)
    }

    /// Controller over the history file, with persisted history restored.
    fn controller<S: HistoryStore>(&self, store: S) -> Result<ChatController<S>, Box<dyn Error>> {
        let mut controller = ChatController::new(store, Arc::new(self.client()?));
        controller.initialize();
        Ok(controller)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let ctx = match Context::load(cli.api_url.as_deref(), cli.data_dir) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tui_mode = matches!(cli.command, None | Some(Commands::Tui));
    let log_file = tui_mode.then(|| ctx.data_dir.join(LOG_FILE));
    init_logging(cli.verbose, log_file.as_deref());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        None | Some(Commands::Tui) => rt.block_on(cmd_tui(&ctx)),
        Some(Commands::Send { question }) => rt.block_on(cmd_send(&ctx, &question.join(" "))),
        Some(Commands::History { json }) => cmd_history(&ctx, json),
        Some(Commands::Clear { yes }) => cmd_clear(&ctx, yes),
        Some(Commands::Doctor { json }) => rt.block_on(cmd_doctor(&ctx, json)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber.
///
/// The TUI owns the terminal, so its logs go to a file; other commands log
/// to stderr. `RUST_LOG` overrides the level.
fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let default_level = match (verbose, log_file.is_some()) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file.and_then(open_log_file) {
        Some(file) => registry
            .with(fmt_layer.with_ansi(false).with_writer(Mutex::new(file)))
            .init(),
        None => registry.with(fmt_layer.with_writer(io::stderr)).init(),
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

async fn cmd_tui(ctx: &Context) -> CliResult {
    let store: Box<dyn HistoryStore> = Box::new(FileStore::new(ctx.history_path()));
    let controller = ChatController::new(store, Arc::new(ctx.client()?));
    let app = App::new(controller, ctx.endpoint.clone());

    ask_tui::run_tui(app).await?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_send(ctx: &Context, question: &str) -> CliResult {
    let mut controller = ctx.controller(FileStore::new(ctx.history_path()))?;
    controller.set_draft(question);

    debug!(endpoint = %ctx.endpoint, "Sending question");
    match controller.submit().await {
        Some(Ok(answer)) => {
            println!("{}", answer.content);
            Ok(ExitCode::SUCCESS)
        }
        Some(Err(failure)) => {
            println!("{}", failure.content);
            Ok(ExitCode::FAILURE)
        }
        None => Err("question is empty".into()),
    }
}

fn cmd_history(ctx: &Context, json: bool) -> CliResult {
    let controller = ctx.controller(FileStore::new(ctx.history_path()))?;
    let messages = controller.messages();

    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(ExitCode::SUCCESS);
    }

    if messages.is_empty() {
        println!("No saved conversation");
        return Ok(ExitCode::SUCCESS);
    }

    for msg in messages {
        println!(
            "[{}] {}: {}",
            msg.timestamp.format("%Y-%m-%d %H:%M"),
            msg.role.label(),
            msg.content
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_clear(ctx: &Context, yes: bool) -> CliResult {
    let mut controller = ctx.controller(FileStore::new(ctx.history_path()))?;
    let count = controller.messages().len();
    if count == 0 {
        println!("No saved conversation");
        return Ok(ExitCode::SUCCESS);
    }

    let cleared = controller.clear(|| {
        yes || confirm(
            &format!("Clear {count} message(s) of history? [y/N] "),
            io::stdin().lock(),
        )
    });

    if cleared {
        info!(count, "History cleared from CLI");
        println!("History cleared");
    } else {
        println!("Cancelled");
    }
    Ok(ExitCode::SUCCESS)
}

/// Ask a yes/no question on stdout; only an explicit yes confirms.
fn confirm(prompt: &str, mut input: impl BufRead) -> bool {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn cmd_doctor(ctx: &Context, json: bool) -> CliResult {
    let history_path = ctx.history_path();
    let client = ctx.client()?;

    let started = Instant::now();
    let outcome = client.ask(PROBE_QUESTION).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let ok = outcome.is_ok();

    if json {
        let (answer, error) = match &outcome {
            Ok(answer) => (Some(answer.as_str()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let report = serde_json::json!({
            "endpoint": ctx.endpoint,
            "data_dir": ctx.data_dir,
            "history_file": history_path,
            "history_exists": history_path.exists(),
            "request_timeout_seconds": ctx.config.request_timeout_seconds,
            "ok": ok,
            "latency_ms": latency_ms,
            "answer": answer,
            "error": error,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("ask diagnostics\n");
        println!("  Endpoint:     {}", ctx.endpoint);
        println!("  Data dir:     {}", ctx.data_dir.display());
        let history_state = if history_path.exists() {
            "present"
        } else {
            "not created yet"
        };
        println!(
            "  History file: {} ({history_state})",
            history_path.display()
        );
        match ctx.config.request_timeout_seconds {
            Some(secs) => println!("  Timeout:      {secs}s"),
            None => println!("  Timeout:      none"),
        }
        println!();

        match &outcome {
            Ok(answer) => {
                println!("  Probe: ok ({latency_ms} ms)");
                println!("  Answer: {answer}");
            }
            Err(e) => {
                println!("  Probe: failed after {latency_ms} ms");
                println!("  Reason: {e}");
            }
        }
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use clap::CommandFactory;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_tui() {
        let cli = Cli::try_parse_from(["ask"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_send_joins_words_and_accepts_global_flags() {
        let cli = Cli::try_parse_from([
            "ask",
            "send",
            "What",
            "is",
            "Rust?",
            "--api-url",
            "http://localhost:8080",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:8080"));
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Send { question }) => assert_eq!(question.join(" "), "What is Rust?"),
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_send_requires_question() {
        assert!(Cli::try_parse_from(["ask", "send"]).is_err());
    }

    #[test]
    fn test_context_uses_config_file_and_flag_override() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            api_url: "https://chat.example.com".to_string(),
            history_file: PathBuf::from("saved.json"),
            request_timeout_seconds: Some(30),
        };
        config.save(&temp.path().join(CONFIG_FILE)).unwrap();

        let ctx = Context::load(None, Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.endpoint, "https://chat.example.com/api/ask");
        assert_eq!(ctx.history_path(), temp.path().join("saved.json"));

        let ctx = Context::load(
            Some("http://127.0.0.1:9000/custom"),
            Some(temp.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(ctx.endpoint, "http://127.0.0.1:9000/custom");
    }

    #[test]
    fn test_context_rejects_invalid_url() {
        let temp = TempDir::new().unwrap();
        assert!(Context::load(Some("not a url"), Some(temp.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_confirm_accepts_only_yes() {
        assert!(confirm("? ", "y\n".as_bytes()));
        assert!(confirm("? ", "YES\n".as_bytes()));
        assert!(!confirm("? ", "\n".as_bytes()));
        assert!(!confirm("? ", "nope\n".as_bytes()));
        assert!(!confirm("? ", "".as_bytes()));
    }

    async fn spawn_server(status: StatusCode, body: Value) -> String {
        let router = Router::new().route(
            "/api/ask",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/ask")
    }

    #[tokio::test]
    async fn test_send_exit_code_follows_request_outcome() {
        let temp = TempDir::new().unwrap();

        let url = spawn_server(
            StatusCode::OK,
            json!({ "response": "❌ is the cross mark emoji" }),
        )
        .await;
        let ctx = Context::load(Some(url.as_str()), Some(temp.path().to_path_buf())).unwrap();
        let code = cmd_send(&ctx, "What is this emoji called?").await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let url = spawn_server(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "overloaded" }),
        )
        .await;
        let ctx = Context::load(Some(url.as_str()), Some(temp.path().to_path_buf())).unwrap();
        let code = cmd_send(&ctx, "hello").await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn test_clear_with_yes_erases_history() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::load(None, Some(temp.path().to_path_buf())).unwrap();
        let mut store = FileStore::new(ctx.history_path());
        store
            .write(r#"[{"role":"user","content":"hi","timestamp":"2024-01-01T00:00:00Z"}]"#)
            .unwrap();

        cmd_clear(&ctx, true).unwrap();
        assert!(!ctx.history_path().exists());
    }
}
