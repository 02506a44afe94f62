use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speech_stream::audio::wav;
use speech_stream::protocol::frame;
use speech_stream::{
    AudioBackend, AudioFile, ChannelTransport, Config, FileBackend, SessionDriver, SpeechSession,
    TransportCommand, TransportEvent, WavChunker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "speech-stream")]
#[command(about = "Speech streaming protocol tools")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/speech-stream")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the format of a WAV file (or raw 16 kHz PCM)
    Inspect { path: PathBuf },

    /// Re-encode a WAV file as 16-bit PCM
    Encode { input: PathBuf, output: PathBuf },

    /// Stream a WAV file through a speech session over a simulated socket
    Replay {
        path: PathBuf,

        /// Send frames as fast as possible instead of in real time
        #[arg(long)]
        fast: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Speech Stream v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match args.command {
        Command::Inspect { path } => inspect(&path),
        Command::Encode { input, output } => encode(&input, &output),
        Command::Replay { path, fast } => replay(&cfg, &path, fast).await,
    }
}

fn inspect(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let buffer = wav::decode(&bytes)?;

    println!("File:        {}", path.display());
    println!("RIFF header: {}", wav::has_riff_header(&bytes));
    println!("Sample rate: {} Hz", buffer.sample_rate);
    println!("Channels:    {}", buffer.channels);
    println!("Bit depth:   {}", buffer.bit_depth);
    println!("Samples:     {}", buffer.pcm_samples.len());
    println!("Duration:    {:.2}s", buffer.duration_secs());
    Ok(())
}

fn encode(input: &Path, output: &Path) -> Result<()> {
    let audio = AudioFile::open(input)?;
    let bytes = audio.to_wav_bytes()?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Encoded {} ({:.1}s) to {} ({} bytes)",
        input.display(),
        audio.duration_seconds,
        output.display(),
        bytes.len()
    );
    Ok(())
}

async fn replay(cfg: &Config, path: &Path, fast: bool) -> Result<()> {
    let audio = AudioFile::open(path)?;
    cfg.check_audio_format(audio.sample_rate, audio.channels)
        .with_context(|| format!("Cannot replay {}", path.display()))?;
    let session = SpeechSession::new(cfg.to_session_config());
    info!("Endpoint: {}", session.config().endpoint());

    let mut backend_config = cfg.backend_config();
    backend_config.realtime = !fast;
    let mut backend = FileBackend::new(audio, backend_config);

    let (transport, commands) = ChannelTransport::pair(64);
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let (capture_tx, capture_rx) = mpsc::channel(32);
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let (done_tx, done_rx) = oneshot::channel();

    let socket = tokio::spawn(simulated_socket(commands, inbound_tx, done_rx));

    let driver = SessionDriver::new(session, Arc::new(transport)).with_subscriber(events_tx);
    let driver = tokio::spawn(driver.run(inbound_rx, capture_rx));

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!("Event: {:?}", event);
        }
    });

    let frames = backend.start().await?;
    let mut chunker = WavChunker::new(cfg.chunk_config());
    let chunk_stats = chunker.record(frames, capture_tx).await?;
    backend.stop().await?;
    let _ = done_tx.send(chunk_stats.chunk_count);

    let stats = driver.await.context("Session driver panicked")??;
    socket.await.context("Socket task panicked")?;
    printer.await.context("Event printer panicked")?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Stand-in for the speech service: opens, logs outbound frames, and once
/// every chunk has arrived ends the turn and closes
async fn simulated_socket(
    mut commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
    mut done: oneshot::Receiver<usize>,
) {
    if events.send(TransportEvent::Open).await.is_err() {
        return;
    }

    let mut expected: Option<usize> = None;
    let mut received = 0usize;
    let mut request_id = String::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::SendText(text)) => {
                    debug!("Socket <- text:\n{}", text);
                }
                Some(TransportCommand::SendBinary(bytes)) => {
                    received += 1;
                    match frame::split_binary_message(&bytes) {
                        Some((header, payload)) => {
                            if let Some(id) = header
                                .lines()
                                .find_map(|line| line.strip_prefix("X-RequestId: "))
                            {
                                request_id = id.to_string();
                            }
                            debug!("Socket <- audio {} ({} bytes)", received, payload.len());
                        }
                        None => warn!("Socket <- malformed binary frame"),
                    }
                }
                Some(TransportCommand::Close) | None => {
                    let _ = events
                        .send(TransportEvent::Close {
                            reason: "closed by client".into(),
                            was_clean: true,
                        })
                        .await;
                    return;
                }
            },
            count = &mut done, if expected.is_none() => {
                expected = Some(count.unwrap_or(0));
            }
        }

        if expected.is_some_and(|n| received >= n) {
            let turn_end = format!("Path: turn.end\r\nX-RequestId: {}\r\n\r\n{{}}", request_id);
            let _ = events.send(TransportEvent::text(turn_end)).await;
            let _ = events
                .send(TransportEvent::Close {
                    reason: "replay finished".into(),
                    was_clean: true,
                })
                .await;
            return;
        }
    }
}
