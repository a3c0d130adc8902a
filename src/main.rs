use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use realtime_voice::tools::{
    Capability, CapabilityRegistry, EventDefinition, ToolArguments, ToolDefinition, ToolOutput, ToolParameter,
};
use realtime_voice::types::audio::Voice;
use realtime_voice::utils::capture::CapturePipeline;
use realtime_voice::utils::device::{self, CpalInputDevice, PlaybackOutput};
use realtime_voice::{
    AgentCommand, AgentHandle, AudioSink, Config, SessionController, SessionEvent, VoiceAgent, WebSocketTransport,
};

#[derive(Parser)]
#[command(version, about = "Talk to a realtime voice model from the terminal")]
struct Cli {
    /// Microphone to use (default input device if omitted)
    #[arg(long)]
    input: Option<String>,
    /// Speaker to use (default output device if omitted)
    #[arg(long)]
    output: Option<String>,
    /// Print the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
    /// Assistant voice, e.g. alloy, coral, verse
    #[arg(long)]
    voice: Option<String>,
    /// System instructions; overrides REALTIME_INSTRUCTIONS
    #[arg(long)]
    instructions: Option<String>,
    /// Let the assistant speak first
    #[arg(long)]
    greet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        println!("Available inputs: {}", device::get_available_inputs()?);
        println!("Available outputs: {}", device::get_available_outputs()?);
        return Ok(());
    }

    let mut builder = Config::from_env()
        .context("Failed to load configuration")?
        .into_builder();
    if let Some(voice) = &cli.voice {
        let Ok(voice) = voice.parse::<Voice>();
        builder = builder.with_voice(voice);
    }
    if let Some(instructions) = &cli.instructions {
        builder = builder.with_instructions(instructions);
    }
    if cli.greet {
        builder = builder.with_initial_response(true);
    }
    let config = builder.build();
    let capture_settings = config.capture();

    // Keep the output stream alive for the whole session.
    let output = PlaybackOutput::open(cli.output.as_deref()).context("Failed to open output device")?;
    let sink: Arc<dyn AudioSink> = output.queue();

    let controller =
        SessionController::new(config, WebSocketTransport::default(), sink).with_capabilities(host_capabilities());
    let notifications = controller.subscribe();

    let mut capture = CapturePipeline::new(CpalInputDevice::new(), capture_settings);
    capture.set_device(cli.input.as_deref())?;

    let agent = VoiceAgent::new(controller, capture);
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));
    tokio::spawn(read_commands(agent.handle()));
    tokio::spawn(print_notifications(notifications));

    println!("Speak, or type a message. Commands: /event <name>, /cancel, /respond, /commit, /voice <name>, /quit");
    let controller = agent.run(shutdown).await.context("Session failed")?;

    let stats = controller.stats();
    tracing::info!(
        responses = stats.responses(),
        total_tokens = stats.total_tokens(),
        input_tokens = stats.input_tokens(),
        output_tokens = stats.output_tokens(),
        "session finished"
    );
    drop(output);
    Ok(())
}

fn host_capabilities() -> CapabilityRegistry {
    let current_time = ToolDefinition::new(
        "get_current_time",
        "Returns the current time as seconds since the Unix epoch.",
        current_time,
    )
    .with_parameter(ToolParameter::boolean("milliseconds", "Return milliseconds instead of seconds").optional());

    let waved = EventDefinition::new(
        "user_waved",
        "The user waved at the assistant",
        "The user just waved at you. Wave back and say hello.",
    );

    CapabilityRegistry::new().with_provider(vec![Capability::from(current_time), Capability::from(waved)])
}

async fn current_time(args: ToolArguments) -> Result<ToolOutput> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    let value = if args.bool("milliseconds").unwrap_or(false) {
        json!({ "unix_time_ms": now.as_millis() as u64 })
    } else {
        json!({ "unix_time": now.as_secs() })
    };
    Ok(ToolOutput::Json(value))
}

async fn watch_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        return;
    }
    shutdown.cancel();
}

/// Turns stdin lines into agent commands until stdin closes or the agent stops.
async fn read_commands(handle: AgentHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("failed to read stdin: {}", e);
                break;
            }
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };
        let quit = command == AgentCommand::Shutdown;
        if handle.send(command).await.is_err() || quit {
            break;
        }
    }
}

fn parse_command(line: &str) -> Option<AgentCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };
    let command = match command {
        "/event" if !argument.is_empty() => AgentCommand::PublishEvent(argument.to_string()),
        "/cancel" => AgentCommand::CancelResponses,
        "/respond" => AgentCommand::RequestResponse,
        "/commit" => AgentCommand::CommitAudio,
        "/voice" if !argument.is_empty() => {
            let Ok(voice) = argument.parse::<Voice>();
            AgentCommand::SetVoice(voice)
        }
        "/quit" => AgentCommand::Shutdown,
        other if other.starts_with('/') => {
            eprintln!("unknown command: {line}");
            return None;
        }
        _ => AgentCommand::UserMessage {
            text: line.to_string(),
            interrupt: true,
            request_response: true,
        },
    };
    Some(command)
}

async fn print_notifications(mut notifications: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match notifications.recv().await {
            Ok(SessionEvent::UserTranscript(text)) => println!("you: {}", text.trim()),
            Ok(SessionEvent::AssistantTranscript(text)) => println!("assistant: {}", text.trim()),
            Ok(SessionEvent::Error(message)) => eprintln!("error: {message}"),
            Ok(SessionEvent::StatusChanged(status)) => println!("[{status}]"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "notification listener lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
