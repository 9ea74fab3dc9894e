use anyhow::Result;
use clap::Parser;
use vocast::cli::Cli;
use vocast::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = cli.apply_to(config.with_env_overrides());
    config.validate()?;

    #[cfg(not(feature = "whisper"))]
    {
        let _ = config;
        anyhow::bail!(
            "this build has no transcription engine; rebuild with `cargo build --features whisper`"
        );
    }

    #[cfg(feature = "whisper")]
    {
        use vocast::stt::{WhisperEngine, WhisperEngineConfig};

        let engine = WhisperEngine::new(WhisperEngineConfig {
            model_path: config.stt.model.clone(),
            language: config.stt.language.clone(),
            use_gpu: config.stt.gpu,
            threads: None,
        })?;

        run(config, engine, cli.quiet).await
    }
}

/// Log to stderr so stdout stays free for the live transcript.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "whisper")]
async fn run<E>(config: Config, engine: E, quiet: bool) -> Result<()>
where
    E: vocast::TranscriptionEngine + 'static,
{
    use std::sync::Arc;
    use tokio::sync::watch;
    use vocast::audio::{AudioFormat, aggregator};
    use vocast::broadcast::BroadcastQueue;
    use vocast::pipeline::{PipelineConfig, PipelineDriver};
    use vocast::server::DeliveryServer;
    use vocast::{TranscriptionEngine, defaults};

    tracing::info!(model = engine.model_name(), "model loaded");
    println!("Model loaded.\n");

    let (ingest, agg) = aggregator();
    let queue = BroadcastQueue::new(config.server.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = DeliveryServer::bind(&config.server.listen)
        .await?
        .with_greeting(config.server.greeting.clone())
        .with_subscriber_wait(config.server.subscriber_wait());
    tracing::info!(addr = %server.local_addr()?, "delivery server listening");
    let server_task = tokio::spawn(server.serve(queue.clone(), shutdown_rx.clone()));

    let format = AudioFormat::new(config.audio.sample_rate, config.audio.sample_width);
    spawn_stdin_capture(ingest, format, config.audio.record_timeout());

    let driver = PipelineDriver::new(
        agg,
        Arc::new(engine),
        queue,
        PipelineConfig {
            phrase_timeout: config.audio.phrase_timeout(),
            poll_interval: defaults::POLL_INTERVAL,
            echo_transcript: !quiet,
        },
    );
    let driver_task = tokio::spawn(driver.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);

    let log = driver_task.await?;
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "delivery server exited with error"),
        Err(e) => tracing::warn!(error = %e, "delivery server task panicked"),
    }

    println!("\n\nTranscription:");
    println!("{}", log.render());
    Ok(())
}

/// Stand-in for the audio capture collaborator: reads raw PCM from stdin in
/// capture-cadence-sized slices and feeds them to the aggregator.
#[cfg(feature = "whisper")]
fn spawn_stdin_capture(
    ingest: vocast::IngestHandle,
    format: vocast::AudioFormat,
    record_timeout: std::time::Duration,
) -> std::thread::JoinHandle<()> {
    use std::io::Read;
    use vocast::AudioChunk;

    std::thread::spawn(move || {
        // One chunk per capture cadence, rounded to whole samples.
        let chunk_bytes = ((format.bytes_per_second() as f64 * record_timeout.as_secs_f64())
            as usize)
            .max(format.sample_width as usize);

        let mut stdin = std::io::stdin().lock();
        let mut buf = vec![0u8; chunk_bytes];

        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => ingest.ingest(AudioChunk::new(buf[..n].to_vec(), format)),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "capture read failed");
                    break;
                }
            }
        }

        tracing::debug!("capture stream closed");
    })
}
