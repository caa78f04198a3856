//! CLI binary for blogclip.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, prints the script and prompts, and optionally
//! writes the downloadable artifacts.

use anyhow::{Context, Result};
use blogclip::{
    run, save_images, write_artifacts, ModelId, PipelineConfig, ProgressCallback,
    RunProgressCallback, Stage, StyleId,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the text stages run, then a bar over the image requests.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix("Working");
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar
            .println(format!("{} {}", cyan("◆"), dim(&format!("{stage} done"))));
    }

    fn on_notice(&self, stage: Stage, message: &str) {
        if stage == Stage::ExtractPrompts {
            self.bar.println(format!("  {} {}", cyan("⚠"), message));
        }
    }

    fn on_image_start(&self, index: usize, total: usize) {
        if index == 0 || self.bar.length() != Some(total as u64) {
            self.activate_bar(total);
        }
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(format!("image {}", index + 1));
    }

    fn on_image_complete(&self, index: usize, total: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Image {}/{}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Image {}/{}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_images: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_images.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} images rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images rendered  ({} failed)",
                if failed == total_images {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Script, prompts and image URLs on stdout
  blogclip lecture.pdf

  # Longer script, watercolor images
  blogclip --length 2000 --style watercolor lecture.pdf

  # Write video_script.txt, image_prompts.json, video_creation_results.json
  blogclip lecture.pdf -o out/

  # ...and download the images as scene_<n>.png
  blogclip lecture.pdf -o out/ --save-images

  # From a URL, full bundle as JSON
  blogclip --json https://example.com/paper.pdf > bundle.json

STYLES:
  photorealistic (default), storybook, watercolor, 3d-render, illustration

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (text and images)
  OPENAI_BASE_URL         Override the OpenAI endpoint for image requests
  EDGEQUAKE_LLM_PROVIDER  Override text provider (openai, anthropic, gemini, ollama)
  PDFIUM_LIB_PATH         Path to libpdfium if it is not in the working
                          directory or on the system library path
"#;

/// Turn a PDF into a blog script, image prompts and images.
#[derive(Parser, Debug)]
#[command(
    name = "blogclip",
    version,
    about = "Turn a PDF into a blog script, image prompts and images",
    long_about = "Extract the text of a PDF (local file or URL), have an LLM write a blog \
script from it, derive up to five scene prompts from the script, and render one image per \
prompt in the chosen visual style.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the downloadable artifacts into this directory.
    #[arg(short, long, env = "BLOGCLIP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Also download rendered images as scene_<n>.png (requires --output-dir).
    #[arg(long, env = "BLOGCLIP_SAVE_IMAGES", requires = "output_dir")]
    save_images: bool,

    /// Text model for the script and prompt requests: gpt-3.5-turbo, gpt-4,
    /// gpt-4-turbo.
    #[arg(long, env = "BLOGCLIP_MODEL", default_value = "gpt-4-turbo",
          value_parser = ModelId::from_str)]
    model: ModelId,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "BLOGCLIP_PROVIDER")]
    provider: Option<String>,

    /// Visual style appended to every image prompt: photorealistic, storybook,
    /// watercolor, 3d-render, illustration (or the Korean label). Unknown
    /// names fall back to photorealistic.
    #[arg(long, env = "BLOGCLIP_STYLE", default_value = "photorealistic",
          value_parser = parse_style)]
    style: StyleId,

    /// Approximate script length in characters (100–3000).
    #[arg(short, long, env = "BLOGCLIP_LENGTH", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(100..=3000))]
    length: u64,

    /// Image-generation model.
    #[arg(long, env = "BLOGCLIP_IMAGE_MODEL", default_value = "dall-e-3")]
    image_model: String,

    /// Image requests in flight at once (1–5).
    #[arg(short, long, env = "BLOGCLIP_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Minimum milliseconds between image request starts.
    #[arg(long, env = "BLOGCLIP_PACE_MS", default_value_t = 1000)]
    pace_ms: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BLOGCLIP_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Retries per remote call on transient failure.
    #[arg(long, env = "BLOGCLIP_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call API timeout in seconds.
    #[arg(long, env = "BLOGCLIP_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BLOGCLIP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output the full run bundle as JSON instead of text.
    #[arg(long, env = "BLOGCLIP_JSON")]
    json: bool,

    /// Exit non-zero if any image failed.
    #[arg(long, env = "BLOGCLIP_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "BLOGCLIP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BLOGCLIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BLOGCLIP_QUIET")]
    quiet: bool,
}

fn parse_style(s: &str) -> Result<StyleId, Infallible> {
    Ok(StyleId::from_label(s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run(&cli.input, &config).await.context("Run failed")?;

    if cli.json {
        println!("{}", output.bundle.to_json_pretty()?);
    } else if !cli.quiet {
        println!("{}", bold("── Script ──"));
        println!("{}\n", output.bundle.script);
        println!("{}", bold("── Scenes ──"));
        for (idx, image) in output.bundle.images.iter().enumerate() {
            let url = match image.url {
                Some(ref u) if u.starts_with("data:") => dim("<inline image data>"),
                Some(ref u) => u.clone(),
                None => red("(failed)"),
            };
            println!("{}. {}\n   {}", idx + 1, image.prompt, url);
        }
    }

    if !cli.quiet && !cli.json {
        for notice in &output.notices {
            eprintln!("{} {}", cyan("⚠"), notice);
        }
    }

    // ── Export ───────────────────────────────────────────────────────────
    if let Some(ref dir) = cli.output_dir {
        let paths = write_artifacts(dir, &output.bundle)
            .await
            .context("Failed to write artifacts")?;
        if cli.save_images {
            let saved = save_images(dir, &output.bundle, cli.download_timeout)
                .await
                .context("Failed to save images")?;
            if !cli.quiet {
                let n = saved.iter().filter(|p| p.is_some()).count();
                eprintln!("   {} images saved", dim(&n.to_string()));
            }
        }
        if !cli.quiet {
            eprintln!(
                "{}  →  {}",
                green("✔"),
                bold(&paths.bundle.parent().unwrap_or(dir).display().to_string()),
            );
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  ·  {}ms total",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    if cli.strict {
        output.into_result().context("Some images failed")?;
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .target_length(cli.length as usize)
        .model(cli.model)
        .style(cli.style)
        .image_model(&cli.image_model)
        .image_concurrency(cli.concurrency)
        .pace_ms(cli.pace_ms)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_and_style_parse_through_library_types() {
        let cli = Cli::try_parse_from([
            "blogclip",
            "talk.pdf",
            "--model",
            "gpt-4",
            "--style",
            "수채화 스타일",
        ])
        .unwrap();
        assert_eq!(cli.model, ModelId::Gpt4);
        assert_eq!(cli.style, StyleId::Watercolor);
    }

    #[test]
    fn unknown_style_falls_back_to_photorealistic() {
        let cli = Cli::try_parse_from(["blogclip", "talk.pdf", "--style", "cubist"]).unwrap();
        assert_eq!(cli.style, StyleId::Photorealistic);
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["blogclip", "talk.pdf", "--model", "gpt-5"]).is_err());
    }
}
