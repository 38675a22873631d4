use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use passgate_chat::api::{ChatApi, EndpointResolver, HttpTransport};
use passgate_chat::config::AppConfig;
use passgate_chat::credential::{CredentialStore, FileBackend, SessionContext};
use passgate_chat::models::{Message, MessageRole};
use passgate_chat::service::conversation::CONTINUE_CREDENTIAL_PROMPT;
use passgate_chat::service::{ConversationClient, HistoryOutcome, SendOutcome, SessionBootstrap};
use passgate_chat::ClientError;

#[derive(Parser)]
#[command(name = "passgate-chat", about = "Chat with a password-gated assistant")]
struct Cli {
    /// Resume an existing conversation instead of starting a new one
    conversation_id: Option<String>,

    /// Forget the stored access code before starting
    #[arg(long)]
    forget: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they stay out of the conversation
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "passgate_chat=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let store = match &config.credential_file {
        Some(path) => CredentialStore::new(FileBackend::new(path)),
        None => CredentialStore::in_memory(),
    };
    let context = SessionContext::load(store);
    if cli.forget {
        context.clear();
    }

    let api = ChatApi::new(
        EndpointResolver::from_config(&config),
        Arc::new(HttpTransport::new()),
    );
    info!("Using API at {}", api.resolver().resolve("session"));

    let mut editor = DefaultEditor::new()?;

    // ── Start screen ──────────────────────────────────────────────────────────
    let conversation_id = match cli.conversation_id {
        Some(id) => id,
        None => {
            let bootstrap = SessionBootstrap::new(api.clone(), context.clone());
            match start_screen(&mut editor, &bootstrap).await? {
                Some(id) => id,
                None => return Ok(()),
            }
        }
    };

    // ── Chat screen ───────────────────────────────────────────────────────────
    let client = ConversationClient::new(api, context, conversation_id);
    chat_screen(&mut editor, &client).await?;
    client.close();
    Ok(())
}

/// Prompts for the access code until a session starts. `None` when the user quits.
async fn start_screen(
    editor: &mut DefaultEditor,
    bootstrap: &SessionBootstrap,
) -> Result<Option<String>> {
    println!("{}", "Start a new session whenever you are ready.".bright_cyan().bold());

    loop {
        let prefill = bootstrap.stored_credential().unwrap_or_default();
        let Some(line) = read_line(editor, "Access password: ", &prefill)? else {
            return Ok(None);
        };

        println!("{}", "Preparing your session…".bright_black());
        match bootstrap.start_session(&line).await {
            Ok(conversation_id) => return Ok(Some(conversation_id)),
            Err(e) => print_error(&e),
        }
    }
}

async fn chat_screen(editor: &mut DefaultEditor, client: &ConversationClient) -> Result<()> {
    println!(
        "{}",
        format!("Conversation ID - {}", client.conversation_id()).bright_black()
    );
    println!("{}", "Type /forget to switch access code, /quit to leave.\n".bright_black());

    let initial = client.load_history().await;
    if !open_history(editor, client, initial).await? {
        return Ok(());
    }

    loop {
        let Some(line) = read_line(editor, &format!("{} ", "You:".bright_green().bold()), "")? else {
            return Ok(());
        };

        if !line.trim().is_empty() {
            editor.add_history_entry(line.as_str())?;
        }

        let outcome = match line.trim() {
            "/quit" | "/exit" => return Ok(()),
            "/forget" => {
                client.forget_credential();
                Ok(HistoryOutcome::NeedsCredential)
            }
            _ => match client.send_message(&line).await {
                Ok(SendOutcome::Replied(reply)) => {
                    print_message(&reply);
                    continue;
                }
                Ok(SendOutcome::Ignored | SendOutcome::Busy | SendOutcome::Stale) => continue,
                Ok(SendOutcome::NeedsCredential) => Ok(HistoryOutcome::NeedsCredential),
                Err(e) if e.is_auth() => Err(e),
                Err(e) => {
                    if let Some(last) = client.messages().last() {
                        print_message(last);
                    }
                    print_error(&e);
                    continue;
                }
            },
        };

        if !open_history(editor, client, outcome).await? {
            return Ok(());
        }
    }
}

/// Renders a history load, asking for the access code for as long as it is
/// missing or rejected. Returns `false` when the user quits.
async fn open_history(
    editor: &mut DefaultEditor,
    client: &ConversationClient,
    mut outcome: Result<HistoryOutcome, ClientError>,
) -> Result<bool> {
    loop {
        match outcome {
            Ok(HistoryOutcome::Loaded(messages)) => {
                for message in &messages {
                    print_message(message);
                }
                if let Some(status) = client.snapshot().status {
                    println!("{}", status.bright_black());
                }
                return Ok(true);
            }
            Ok(HistoryOutcome::Busy | HistoryOutcome::Stale) => return Ok(true),
            Err(e) if !e.is_auth() => {
                print_error(&e);
                return Ok(true);
            }
            Ok(HistoryOutcome::NeedsCredential) | Err(_) => {
                if let Some(prompt) = client.snapshot().credential_prompt {
                    println!("{}", prompt.yellow());
                }
                let Some(code) = prompt_access_code(editor)? else {
                    return Ok(false);
                };
                outcome = client.unlock(&code).await;
            }
        }
    }
}

/// Reads a non-blank access code. `None` when the user quits.
fn prompt_access_code(editor: &mut DefaultEditor) -> Result<Option<String>> {
    loop {
        match read_line(editor, "Access code: ", "")? {
            Some(code) if code.trim().is_empty() => {
                println!("{}", CONTINUE_CREDENTIAL_PROMPT.yellow());
            }
            other => return Ok(other),
        }
    }
}

fn read_line(editor: &mut DefaultEditor, prompt: &str, initial: &str) -> Result<Option<String>> {
    match editor.readline_with_initial(prompt, (initial, "")) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_message(message: &Message) {
    let label = match message.role {
        MessageRole::User => "You:".bright_green().bold(),
        MessageRole::Assistant => "Assistant:".bright_blue().bold(),
    };
    println!("{label} {}", message.content);
}

fn print_error(err: &ClientError) {
    println!("{}", err.to_string().red());
}
