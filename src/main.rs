use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voicechat::api::{ApiServer, ApiState};
use voicechat::repl::Repl;
use voicechat::voice::{AudioCapture, AudioPlayback, Waveform};
use voicechat::{
    ChatterboxClient, Config, GeminiGenerator, LanguageCatalog, Session, SpeechSynthesizer,
    TurnSynthesisPipeline,
};

/// voicechat - talk to an LLM that answers in your own voice
#[derive(Parser)]
#[command(name = "voicechat", version, about)]
struct Cli {
    /// Language label to answer in (e.g. "Korean")
    #[arg(short, long)]
    language: Option<String>,

    /// WAV file to use as the reference voice
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Chatterbox TTS server URL
    #[arg(long)]
    tts_url: Option<String>,

    /// Device the speech model is loaded on (cpu, cuda, mps)
    #[arg(long)]
    device: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat in the terminal (default)
    Chat {
        /// Don't play replies automatically
        #[arg(long)]
        no_autoplay: bool,
    },
    /// Serve the session over HTTP
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// List selectable languages
    Languages,
    /// Synthesize one sentence with the reference voice
    Speak {
        /// Text to speak
        #[arg(default_value = "밖에 비가 많이오는데 집에 어떻게 가지?")]
        text: String,
        /// Language code of the text
        #[arg(short, long, default_value = "ko")]
        code: String,
        /// Write the WAV here instead of playing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voicechat=info",
        1 => "info,voicechat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(language) = cli.language {
        config.session.language = Some(language);
    }
    if let Some(reference) = cli.reference {
        config.session.reference_audio = Some(reference);
    }
    if let Some(url) = cli.tts_url {
        config.tts.url = url;
    }
    if let Some(device) = cli.device {
        config.tts.device = device;
    }
    tracing::debug!(?config, "loaded configuration");

    let catalog = Arc::new(LanguageCatalog::default());

    match cli.command.unwrap_or(Command::Chat { no_autoplay: false }) {
        Command::Chat { no_autoplay } => chat(&config, catalog, !no_autoplay).await,
        Command::Serve { port } => serve(config, catalog, port).await,
        Command::Languages => {
            list_languages(&catalog);
            Ok(())
        }
        Command::Speak { text, code, output } => {
            speak(&config, catalog, &text, &code, output.as_deref()).await
        }
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
    }
}

/// Session from config: initial language, failure policy, reference voice
fn build_session(config: &Config, catalog: Arc<LanguageCatalog>) -> anyhow::Result<Session> {
    let label = config
        .session
        .language
        .clone()
        .or_else(|| catalog.default_label().map(ToString::to_string))
        .ok_or_else(|| anyhow::anyhow!("language catalog is empty"))?;

    let mut session =
        Session::new(catalog, &label)?.with_failure_policy(config.session.failure_policy);
    if let Some(path) = &config.session.reference_audio {
        session.set_reference_path(path.clone())?;
    }
    Ok(session)
}

/// Pipeline from config; loads the speech model once
async fn build_pipeline(
    config: &Config,
    catalog: Arc<LanguageCatalog>,
) -> anyhow::Result<TurnSynthesisPipeline> {
    let generator = GeminiGenerator::new(&config.llm)?;
    let synthesizer = ChatterboxClient::load(&config.tts, catalog).await?;
    Ok(TurnSynthesisPipeline::new(
        Arc::new(generator),
        Arc::new(synthesizer),
        config.generation_params(),
    ))
}

#[allow(clippy::future_not_send)]
async fn chat(
    config: &Config,
    catalog: Arc<LanguageCatalog>,
    autoplay: bool,
) -> anyhow::Result<()> {
    let session = build_session(config, Arc::clone(&catalog))?;
    let pipeline = build_pipeline(config, catalog).await?;

    let mut repl = Repl::new(session, pipeline, config.reference_audio_path(), autoplay);
    repl.run().await?;
    Ok(())
}

async fn serve(
    config: Config,
    catalog: Arc<LanguageCatalog>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let session = build_session(&config, Arc::clone(&catalog))?;
    let pipeline = build_pipeline(&config, catalog).await?;
    let port = port.unwrap_or(config.api_server.port);

    tracing::info!(
        port,
        language = session.language().selected_label(),
        "starting voicechat server"
    );

    let state = ApiState::new(
        session,
        pipeline,
        config.reference_audio_path(),
        config.session.show_audio,
    );
    ApiServer::new(state, port).run().await?;
    Ok(())
}

fn list_languages(catalog: &LanguageCatalog) {
    for label in catalog.selectable_labels() {
        let code = catalog.resolve(label).unwrap_or_default();
        println!("{code:<4} {label}");
    }
}

/// One-shot synthesis smoke test
#[allow(clippy::future_not_send)]
async fn speak(
    config: &Config,
    catalog: Arc<LanguageCatalog>,
    text: &str,
    code: &str,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let reference = config
        .session
        .reference_audio
        .clone()
        .ok_or_else(|| anyhow::anyhow!("a reference voice is required (--reference <wav>)"))?;

    println!("Loading speech model on {}...", config.tts.device);
    let synthesizer = ChatterboxClient::load(&config.tts, catalog).await?;

    println!("Synthesizing \"{text}\" ({code})...");
    let waveform = synthesizer.synthesize(text, &reference, code).await?;
    println!(
        "Got {} samples at {} Hz ({:.1}s)",
        waveform.samples.len(),
        waveform.sample_rate,
        waveform.duration_secs()
    );

    if let Some(path) = output {
        tokio::fs::write(path, waveform.to_wav()?).await?;
        println!("Wrote {}", path.display());
    } else {
        AudioPlayback::new()?.play(&waveform).await?;
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working");
    println!("and /record will capture a usable reference voice.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();
    let waveform = Waveform::new(samples, sample_rate);

    println!(
        "Playing {} samples at {} Hz...",
        waveform.samples.len(),
        sample_rate
    );
    AudioPlayback::new()?.play(&waveform).await?;

    println!("\n---");
    println!("If you heard the tone, replies will play too.");

    Ok(())
}
