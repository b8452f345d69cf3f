//! CLI binary for img2audio.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, asks for paths interactively when none are
//! given, and prints the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use img2audio::{
    ConversionConfig, ConversionProgressCallback, ImageToAudioConverter, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT: &str = "output.mp3";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the running stage, with one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        // The spinner stays hidden until the first stage, after any prompts.
        if stage == Stage::Validate || stage == Stage::Decode {
            self.bar.enable_steady_tick(Duration::from_millis(80));
        }
        self.bar.set_prefix(stage.label());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<26}  {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize) {
        self.bar.set_message(format!("chunk {chunk}/{total}"));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep the line short; the full message is printed on exit.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };
        self.bar
            .println(format!("  {} {:<26}  {}", red("✗"), stage.label(), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive: asks for the image and output paths
  img2audio

  # Convert an image to output.mp3
  img2audio receipt.png

  # Choose the output file and OCR language
  img2audio -l fra lettre.jpg -o lettre.mp3

  # Spanish: Tesseract uses 'spa', the speech service wants 'es'
  img2audio -l spa --tts-lang es carta.png

  # Print the recognised text only (no network access)
  img2audio --text-only scan.tiff

  # List installed Tesseract languages
  img2audio --list-langs

  # JSON output with timings
  img2audio --json scan.png -o scan.mp3 > result.json

ENVIRONMENT VARIABLES:
  TESSERACT_CMD           Path to the tesseract executable (otherwise PATH)
  IMG2AUDIO_LANG          Default OCR language
  IMG2AUDIO_OUTPUT        Default output path
  RUST_LOG                Overrides the log filter

SETUP:
  1. Install Tesseract:  sudo apt-get install tesseract-ocr   (or: brew install tesseract)
  2. Extra languages:    sudo apt-get install tesseract-ocr-fra
  3. Convert:            img2audio image.png -o speech.mp3

  Speech is produced by the Google Translate endpoint, so network access
  is required for everything except --text-only and --list-langs.
"#;

/// Convert the text in an image to spoken audio.
#[derive(Parser, Debug)]
#[command(
    name = "img2audio",
    version,
    about = "Convert the text in an image to spoken audio (Tesseract OCR + Google TTS)",
    long_about = "Extract text from an image with Tesseract OCR and convert it to an MP3 file \
using the Google Translate text-to-speech endpoint. Run without arguments to be asked for \
the image and output paths.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file to read. Prompted for when omitted.
    input: Option<PathBuf>,

    /// Where to write the MP3 (default: output.mp3).
    #[arg(short, long, env = "IMG2AUDIO_OUTPUT")]
    output: Option<PathBuf>,

    /// Tesseract language code (eng, fra, deu, eng+fra, …).
    #[arg(short, long, env = "IMG2AUDIO_LANG", default_value = "eng")]
    lang: String,

    /// Speech language code, overriding the one derived from --lang.
    #[arg(
        long,
        env = "IMG2AUDIO_TTS_LANG",
        long_help = "Speech language sent to the TTS service. By default the first two \
letters of --lang are used (eng → en). Set this when that prefix is wrong, e.g. \
spa → es, jpn → ja, chi_sim → zh-CN."
    )]
    tts_lang: Option<String>,

    /// Path to the tesseract executable.
    #[arg(long, env = "IMG2AUDIO_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "IMG2AUDIO_PSM",
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// Top-level domain of the speech host (com, co.uk, com.au, …).
    #[arg(long, env = "IMG2AUDIO_TLD", default_value = "com")]
    tld: String,

    /// Speak more slowly.
    #[arg(long, env = "IMG2AUDIO_SLOW")]
    slow: bool,

    /// Maximum characters per speech request.
    #[arg(long, env = "IMG2AUDIO_MAX_CHUNK_CHARS", default_value_t = 100)]
    max_chunk_chars: usize,

    /// Per-request speech timeout in seconds.
    #[arg(long, env = "IMG2AUDIO_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Send the speech language even if it is not in the known list.
    #[arg(long, env = "IMG2AUDIO_NO_LANG_CHECK")]
    no_lang_check: bool,

    /// Print the recognised text only; no audio is produced.
    #[arg(long)]
    text_only: bool,

    /// List installed Tesseract languages and exit.
    #[arg(long)]
    list_langs: bool,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "IMG2AUDIO_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "IMG2AUDIO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2AUDIO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the extracted text.
    #[arg(short, long, env = "IMG2AUDIO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active.
    // Interactive prompts also need a quiet terminal.
    let interactive = cli.input.is_none() && !cli.list_langs;
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_langs;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || interactive {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = show_progress.then(CliProgressCallback::new);
    let result = run(&cli, progress.clone().map(|p| p as ProgressCallback)).await;
    if let Some(p) = progress {
        p.finish();
    }
    result
}

async fn run(cli: &Cli, progress: Option<ProgressCallback>) -> Result<()> {
    let config = build_config(cli, progress)?;

    // Fails here, before any work, when Tesseract is missing.
    let converter = ImageToAudioConverter::new(config.clone())
        .await
        .context("OCR engine check failed")?;
    if !cli.quiet && !cli.json {
        eprintln!("{} Tesseract is properly installed", green("✔"));
        eprintln!("   {}", dim(converter.engine_version()));
    }

    // ── List-languages mode ──────────────────────────────────────────────
    if cli.list_langs {
        let langs = converter
            .languages()
            .await
            .context("Failed to list Tesseract languages")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&langs).context("Failed to serialise languages")?
            );
        } else {
            for lang in langs {
                println!("{lang}");
            }
        }
        return Ok(());
    }

    let (image_path, output_path) = resolve_paths(cli)?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let extracted = converter
            .extract_text(&image_path, &config.language)
            .await
            .context("Text extraction failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&extracted).context("Failed to serialise output")?
            );
        } else {
            print_text(&extracted.text)?;
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = converter
        .convert(&image_path, &output_path, &config.language)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        eprintln!("{}", bold("Extracted text:"));
    }
    print_text(&output.text)?;

    if !cli.quiet {
        eprintln!(
            "{}  {} chars  {} bytes  {}ms  →  {}",
            green("✔"),
            output.stats.text_chars,
            output.stats.audio_bytes,
            output.stats.total_duration_ms,
            bold(&output.audio_path.display().to_string()),
        );
        if output.tts_language != output.language {
            eprintln!(
                "   {}",
                dim(&format!(
                    "OCR language {}  /  speech language {}",
                    output.language, output.tts_language
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .language(cli.lang.clone())
        .tts_tld(cli.tld.clone())
        .slow(cli.slow)
        .max_chunk_chars(cli.max_chunk_chars)
        .request_timeout_secs(cli.timeout)
        .lang_check(!cli.no_lang_check);

    if let Some(ref code) = cli.tts_lang {
        builder = builder.tts_language(code.clone());
    }
    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_cmd(path.clone());
    }
    if let Some(psm) = cli.psm {
        builder = builder.page_seg_mode(psm);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Image and output paths from the arguments, prompting for whatever is missing.
fn resolve_paths(cli: &Cli) -> Result<(PathBuf, PathBuf)> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stderr();

    match cli.input {
        Some(ref image) => {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
            Ok((image.clone(), output))
        }
        None => {
            let image = prompt_image_path(&mut input, &mut out)?;
            // --text-only writes nothing, so there is no output path to ask for.
            let output = match cli.output {
                Some(ref o) => o.clone(),
                None if cli.text_only => PathBuf::from(DEFAULT_OUTPUT),
                None => prompt_output_path(&mut input, &mut out)?,
            };
            Ok((image, output))
        }
    }
}

fn prompt_image_path<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<PathBuf> {
    let line = prompt(input, out, "Enter the path to your image file: ")?;
    Ok(PathBuf::from(line))
}

fn prompt_output_path<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<PathBuf> {
    let line = prompt(
        input,
        out,
        &format!("Enter the desired output audio path (or press Enter for '{DEFAULT_OUTPUT}'): "),
    )?;
    if line.is_empty() {
        Ok(PathBuf::from(DEFAULT_OUTPUT))
    } else {
        Ok(PathBuf::from(line))
    }
}

/// Print `message`, read one line and return it trimmed.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<String> {
    write!(out, "{message}").context("Failed to write prompt")?;
    out.flush().context("Failed to write prompt")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn print_text(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
