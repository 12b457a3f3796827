use anyhow::{Context, Result};
use clap::Parser;
use dreamtrans_bridge::{execute_stream, Config, EnvCredential, StreamingBridge, WsConnector};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Stream raw audio to the realtime recognizer and print transcripts
#[derive(Debug, Parser)]
#[command(name = "dreamtrans-bridge", version)]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/dreamtrans")]
    config: String,

    /// Raw 48kHz f32le PCM file; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Recognition language (defaults to the configured language)
    #[arg(long)]
    language: Option<String>,

    /// Request partial transcripts
    #[arg(long)]
    partials: bool,

    /// Maximum recognition delay in seconds; 0 keeps the upstream default
    #[arg(long, default_value_t = 0.0)]
    max_delay: f64,

    /// Bytes per audio frame sent upstream
    #[arg(long, default_value_t = 8192)]
    chunk_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Upstream endpoint: {}", cfg.upstream.endpoint);

    let connector = WsConnector::new(&cfg.upstream.endpoint)?;
    let credentials = EnvCredential::new(cfg.auth.api_key_env.clone());
    let bridge = StreamingBridge::new(
        Arc::new(connector),
        Arc::new(credentials),
        cfg.bridge_settings(),
    );

    let language = args
        .language
        .clone()
        .unwrap_or_else(|| cfg.streaming.language.clone());
    let attributes = HashMap::from([
        ("language".to_string(), language),
        ("enable_partials".to_string(), args.partials.to_string()),
        ("max_delay".to_string(), args.max_delay.to_string()),
    ]);

    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, shutting down...");
            ctrl_c.cancel();
        }
    });

    let reader: Box<dyn AsyncRead + Send + Unpin> = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open audio input {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let (input_tx, input_rx) = mpsc::channel(cfg.upstream.audio_buffer);
    let (output_tx, mut output_rx) = mpsc::channel::<Vec<u8>>(cfg.upstream.event_buffer);

    let feeder = tokio::spawn(feed_audio(
        reader,
        args.chunk_bytes.max(1),
        input_tx,
        cancel.clone(),
    ));

    let printer = tokio::spawn(async move {
        while let Some(text) = output_rx.recv().await {
            println!("{}", String::from_utf8_lossy(&text));
        }
    });

    let result = execute_stream(&bridge, cancel.clone(), &attributes, input_rx, output_tx).await;

    // Stop the feeder if the session ended before the input did
    cancel.cancel();
    if let Err(e) = printer.await {
        error!("Output printer panicked: {}", e);
    }
    match feeder.await {
        Ok(Ok(chunks)) => info!("Read {} audio chunks", chunks),
        Ok(Err(e)) => warn!("Audio input error: {:#}", e),
        Err(e) => error!("Audio feeder panicked: {}", e),
    }

    match result {
        Ok(stats) => {
            info!(
                "Session finished in {:.1}s: {} frames sent, {} final / {} partial transcripts",
                stats.duration_secs,
                stats.frames_sent,
                stats.finals_forwarded,
                stats.partials_forwarded
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            info!("Session cancelled");
            Ok(())
        }
        Err(e) => Err(e).context("Streaming session failed"),
    }
}

/// Read fixed-size chunks from `reader` and hand them to the session
async fn feed_audio(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    chunk_bytes: usize,
    audio: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> Result<u64> {
    let mut chunks = 0u64;

    loop {
        let mut buf = vec![0u8; chunk_bytes];
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buf) => read.context("Failed to read audio input")?,
        };
        if read == 0 {
            break;
        }
        buf.truncate(read);

        if audio.send(buf).await.is_err() {
            break;
        }
        chunks += 1;
    }

    Ok(chunks)
}
