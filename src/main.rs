//! DraftyFox - rewrite selected text in place with a language model
//!
//! `serve` hosts the inference proxy on a Unix socket; `rewrite` drives the
//! page agent against a single text field from the command line.

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use draftyfox::actions::custom_instruction;
use draftyfox::agent::{ActionOutcome, PageAgent};
use draftyfox::config::{settings_path, FileSettingsStore, SettingsStore};
use draftyfox::core::{ChatModel, OpenAiChat};
use draftyfox::dom::{Document, Element};
use draftyfox::ipc::{socket_path, IpcClient, IpcServer, LocalChannel, ProxyChannel};
use draftyfox::proxy::InferenceProxy;
use draftyfox::utils::char_len;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// IPC socket path
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the inference proxy on the IPC socket
    Serve {
        /// Do not write the audit log
        #[arg(long)]
        no_audit: bool,

        /// Ask the model for plain text instead of structured output
        #[arg(long)]
        unstructured: bool,
    },

    /// Check whether the inference proxy is running
    Status,

    /// Rewrite part of a text and print the new text
    Rewrite {
        /// Built-in action: paraphrase, shorten, expand or improve
        #[arg(short, long, default_value = "improve")]
        action: String,

        /// Free-form instruction, used instead of --action
        #[arg(short, long)]
        instruction: Option<String>,

        /// Selection start (characters); defaults to the beginning
        #[arg(long)]
        start: Option<usize>,

        /// Selection end (characters); defaults to the end
        #[arg(long)]
        end: Option<usize>,

        /// Run the proxy in-process instead of connecting to the socket
        #[arg(long)]
        local: bool,

        /// Text to edit; read from stdin when omitted
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let socket = args.socket.clone().unwrap_or_else(socket_path);
    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::new(
        args.settings.clone().unwrap_or_else(settings_path),
    ));

    match args.command {
        Command::Serve {
            no_audit,
            unstructured,
        } => serve(socket, settings, no_audit, unstructured).await,
        Command::Status => status(socket).await,
        Command::Rewrite {
            action,
            instruction,
            start,
            end,
            local,
            text,
        } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let channel: Arc<dyn ProxyChannel> = if local {
                let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new());
                let proxy = Arc::new(InferenceProxy::new(settings.clone(), model));
                Arc::new(LocalChannel::spawn(proxy).0)
            } else {
                Arc::new(IpcClient::new(socket))
            };
            let new_text = rewrite(
                channel,
                settings,
                &text,
                start,
                end,
                &action,
                instruction.as_deref(),
            )
            .await?;
            println!("{new_text}");
            Ok(())
        }
    }
}

async fn serve(
    socket: PathBuf,
    settings: Arc<dyn SettingsStore>,
    no_audit: bool,
    unstructured: bool,
) -> Result<()> {
    info!("🦊 DraftyFox v{} starting...", env!("CARGO_PKG_VERSION"));

    let model = if unstructured {
        OpenAiChat::new().unstructured()
    } else {
        OpenAiChat::new()
    };
    let proxy = Arc::new(InferenceProxy::new(settings, Arc::new(model)));

    let mut server = IpcServer::new(socket);
    if !no_audit {
        server = server.with_audit_log(draftyfox::audit::default_log_path());
    }
    server.start(proxy).await?;

    info!("✅ Inference proxy ready - press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    server.stop().await;
    Ok(())
}

async fn status(socket: PathBuf) -> Result<()> {
    let client = IpcClient::new(socket);
    if !client.is_proxy_running().await {
        bail!("inference proxy is not running at {:?}", client.path());
    }
    let (configured, model) = client.status().await?;
    println!(
        "running (model: {}, API key: {})",
        model,
        if configured { "configured" } else { "missing" }
    );
    Ok(())
}

/// Drive the page agent against a one-field document
async fn rewrite(
    channel: Arc<dyn ProxyChannel>,
    settings: Arc<dyn SettingsStore>,
    text: &str,
    start: Option<usize>,
    end: Option<usize>,
    action: &str,
    instruction: Option<&str>,
) -> Result<String> {
    let mut doc = Document::new("DraftyFox CLI", "cli://draftyfox");
    let field = doc.insert(Element::textarea(text));
    doc.focus(field);
    if let Some(control) = doc.element_mut(field).and_then(|e| e.control_mut()) {
        control.set_selection_range(start.unwrap_or(0), end.unwrap_or(char_len(text)));
    }
    let document = doc.into_shared();

    let agent = PageAgent::new(document.clone(), channel, settings);
    let session = agent
        .open_menu(None)
        .ok_or_else(|| anyhow!("nothing to rewrite: the selection is empty"))?;

    let outcome = match instruction {
        Some(instruction) => {
            let action = custom_instruction(instruction)
                .ok_or_else(|| anyhow!("the instruction is empty"))?;
            agent.run_action(session, action).await
        }
        None => agent.run_builtin(session, action).await,
    };

    match outcome {
        ActionOutcome::Applied => {
            let doc = document
                .lock()
                .map_err(|e| anyhow!("document lock poisoned: {e}"))?;
            let value = doc
                .element(field)
                .and_then(|e| e.control())
                .map(|c| c.value().to_string())
                .ok_or_else(|| anyhow!("text field disappeared"))?;
            Ok(value)
        }
        ActionOutcome::Failed(message) => bail!(message),
        ActionOutcome::Ignored => bail!("unknown action '{action}'"),
        ActionOutcome::Dropped => bail!("the request was cancelled"),
    }
}
