use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use medbridge::{
    BridgeSession, CaptureConfig, Config, HttpGateway, Message, MicrophoneFactory, SenderRole,
    SUPPORTED_LANGUAGES,
};

/// Interactive client for the bilingual medical conversation bridge.
#[derive(Debug, Parser)]
#[command(name = "medbridge", version)]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/medbridge")]
    config: String,

    /// Override the bridge service base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("could not load config {}: {e}; using defaults", args.config);
            Config::default()
        }
    };
    if let Some(base_url) = args.base_url {
        cfg.service.base_url = base_url;
    }

    info!("medbridge v0.1.0");
    info!("bridge service: {}", cfg.service.base_url);

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        buffer_duration_ms: cfg.audio.buffer_duration_ms,
    };

    let gateway = Arc::new(HttpGateway::new(&cfg.service)?);
    let capture_factory = Arc::new(MicrophoneFactory::new(capture_config.clone()));
    let session = BridgeSession::new(
        gateway,
        capture_factory,
        capture_config,
        cfg.session.clone().into(),
    );

    println!("medbridge: bilingual medical conversation bridge");
    println!("languages: {}", SUPPORTED_LANGUAGES.join(", "));
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !handle_command(&session, line).await {
            break;
        }
    }

    // Make sure the microphone is not left open on exit.
    if session.is_recording().await {
        let _ = session.stop_recording().await;
    }

    Ok(())
}

/// Dispatch one input line. Returns false when the user quits.
async fn handle_command(session: &BridgeSession, line: &str) -> bool {
    let (command, rest) = match line.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => return false,
        "/help" => print_help(),
        "/new" => match session.start_session().await {
            Ok(conversation) => println!("bridge ready: session {}", conversation.id),
            Err(e) => println!("! {e}"),
        },
        "/role" => match rest.to_ascii_lowercase().as_str() {
            "doctor" => {
                session.set_role(SenderRole::Doctor).await;
                println!("speaking as DOCTOR");
            }
            "patient" => {
                session.set_role(SenderRole::Patient).await;
                println!("speaking as PATIENT");
            }
            _ => println!("usage: /role doctor|patient"),
        },
        "/langs" => match rest.split_once(' ') {
            Some((doctor, patient)) => {
                session
                    .set_languages(doctor.trim().to_string(), patient.trim().to_string())
                    .await;
                println!("languages set: {} / {}", doctor.trim(), patient.trim());
            }
            None => println!("usage: /langs <doctor-language> <patient-language>"),
        },
        "/rec" => match session.start_recording().await {
            Ok(true) => println!("recording... (/stop to send)"),
            Ok(false) => println!("already recording"),
            Err(e) => println!("! {e}"),
        },
        "/stop" => match session.stop_recording().await {
            Ok(Some(message)) => print_message(&message),
            Ok(None) => println!("nothing to send"),
            Err(e) => println!("! {e}"),
        },
        "/search" => match session.search(rest).await {
            Ok(Some(count)) => {
                println!("{count} matches");
                for message in session.messages().await {
                    print_message(&message);
                }
            }
            Ok(None) => println!("usage: /search <query>"),
            Err(e) => println!("! {e}"),
        },
        "/summary" => match session.summarize().await {
            Ok(Some(summary)) => println!("--- summary ---\n{summary}\n---------------"),
            Ok(None) => println!("no active session (or a summary is already running)"),
            Err(e) => println!("! {e}"),
        },
        "/dismiss" => {
            session.dismiss_summary().await;
            println!("summary dismissed");
        }
        "/log" => {
            for message in session.messages().await {
                print_message(&message);
            }
        }
        _ => {
            // Plain text is a message in the current role.
            session.set_input(line).await;
            match session.send_message().await {
                Ok(Some(message)) => print_message(&message),
                Ok(None) => println!("no active session, use /new first"),
                Err(e) => println!("! {e}"),
            }
        }
    }

    true
}

fn print_message(message: &Message) {
    // Voice messages may arrive before transcription has produced any text.
    let text = message.original_text.as_deref().unwrap_or("(voice message)");
    let mut line = format!("[{}] {}", message.sender_role, text);
    if let Some(translated) = &message.translated_text {
        line.push_str(&format!("  → {translated}"));
    }
    if let Some(audio_url) = &message.audio_url {
        line.push_str(&format!("  ({audio_url})"));
    }
    println!("{line}");
}

fn print_help() {
    println!("commands: /new /role /langs /rec /stop /search /summary /dismiss /log /quit");
    println!("anything else is sent as a message in the current role");
}
