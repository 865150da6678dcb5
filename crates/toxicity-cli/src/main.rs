use std::{
    borrow::Cow,
    io::Read,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use toxicity_inference::{InferenceConfig, PredictionResult, Predictor};
use toxicity_pre_processing::pre_processor::{
    NormalizationConfig, PaddingSide, TextNormalizer, Vocabulary,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "toxicity")]
#[command(about = "Classify comment text as toxic or non-toxic", long_about = None)]
struct Cli {
    /// Text to analyze (if not provided, reads from stdin)
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Read text from file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Batch process texts (one per line)
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["text", "file"])]
    batch: Option<PathBuf>,

    /// Batch process from JSON array
    #[arg(long, value_name = "PATH", conflicts_with_all = ["text", "file", "batch"])]
    batch_json: Option<PathBuf>,

    /// JSON config file (overridden by TOXICITY_* env vars and flags)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Vocabulary artifact (Keras tokenizer JSON, word index JSON or binary)
    #[arg(long, value_name = "PATH")]
    vocabulary: Option<PathBuf>,

    /// ONNX model artifact
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Encoded sequence length
    #[arg(long, value_name = "N")]
    max_len: Option<usize>,

    /// Side to pad and truncate sequences on
    #[arg(long, value_name = "SIDE")]
    padding: Option<PaddingSide>,

    /// Classification threshold
    #[arg(short = 't', long)]
    threshold: Option<f32>,

    /// Pre-process for BERT-style models
    #[arg(long)]
    bert: bool,

    /// Print the normalized text and encoded ids instead of classifying
    #[arg(short, long)]
    normalize: bool,

    /// Texts per model call in batch mode
    #[arg(long, value_name = "N", default_value_t = 256)]
    chunk_size: usize,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "probability")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode (detailed output)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// Output just the class label (0 or 1)
    Class,
    /// Output toxicity probability as a float 0-1 (default)
    Probability,
    /// Output as JSON
    Json,
    /// Human-readable output with confidence
    Human,
}

#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

enum InputSource {
    Single(String),
    Batch(Vec<String>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = match (cli.quiet, cli.verbose) {
        (true, _) => Verbosity::Quiet,
        (_, true) => Verbosity::Verbose,
        _ => Verbosity::Normal,
    };
    init_tracing(verbosity);

    let config = resolve_config(&cli)?;
    let input_source = determine_input_source(&cli)?;

    if cli.normalize {
        return run_normalize(&input_source, &config);
    }

    let start = matches!(verbosity, Verbosity::Verbose).then(Instant::now);
    let predictor = Predictor::from_config(&config).context("Failed to initialise predictor")?;
    if let Some(start_time) = start {
        eprintln!("Load time: {:?}", start_time.elapsed());
    }

    match input_source {
        InputSource::Single(text) => {
            let start = matches!(verbosity, Verbosity::Verbose).then(Instant::now);
            let result = predictor.predict(&text)?;
            if let Some(start_time) = start {
                eprintln!("Inference time: {:?}", start_time.elapsed());
            }
            output_result(&result, cli.format)?;
        }
        InputSource::Batch(texts) => {
            let results = process_batch(&predictor, &texts, &cli, verbosity)?;
            output_batch_results(&results, cli.format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<InferenceConfig> {
    let mut config = match &cli.config {
        Some(path) => InferenceConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => InferenceConfig::default(),
    }
    .apply_env()?;

    if let Some(path) = &cli.vocabulary {
        config.vocabulary_path = Some(path.clone());
    }
    if let Some(path) = &cli.model {
        config.model_path = Some(path.clone());
    }
    if let Some(max_len) = cli.max_len {
        config.max_sequence_length = max_len;
    }
    if let Some(padding) = cli.padding {
        config.padding = padding;
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if cli.bert {
        config.normalization = NormalizationConfig {
            bert_mode: true,
            ..config.normalization
        };
    }

    config.validate()?;
    debug!(?config, "Resolved configuration");
    Ok(config)
}

fn read_text_file(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} {}", path.display()))
}

/// One comment per line. A trailing newline does not add an empty comment.
fn batch_from_lines(contents: &str) -> Vec<String> {
    contents.lines().map(str::to_owned).collect()
}

fn batch_from_json(contents: &str, path: &Path) -> Result<Vec<String>> {
    serde_json::from_str(contents).with_context(|| {
        format!(
            "{} must hold a JSON array of comment strings",
            path.display()
        )
    })
}

/// Collect the comments to classify.
///
/// clap keeps the positional text and the file flags mutually exclusive, so
/// at most one of them is set. With none given, the whole of stdin is one
/// comment.
fn determine_input_source(cli: &Cli) -> Result<InputSource> {
    let source = match (&cli.text, &cli.file, &cli.batch, &cli.batch_json) {
        (Some(text), ..) => InputSource::Single(text.clone()),
        (_, Some(path), ..) => InputSource::Single(read_text_file(path, "comment file")?),
        (_, _, Some(path), _) => {
            InputSource::Batch(batch_from_lines(&read_text_file(path, "batch file")?))
        }
        (_, _, _, Some(path)) => {
            let contents = read_text_file(path, "JSON batch file")?;
            InputSource::Batch(batch_from_json(&contents, path)?)
        }
        (None, None, None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read comment from stdin")?;
            InputSource::Single(buffer)
        }
    };
    Ok(source)
}

fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Classify a batch, one model call per chunk
fn process_batch(
    predictor: &Predictor,
    texts: &[String],
    cli: &Cli,
    verbosity: Verbosity,
) -> Result<Vec<PredictionResult>> {
    if cli.chunk_size == 0 {
        bail!("--chunk-size must be greater than zero");
    }
    let show_progress = matches!(verbosity, Verbosity::Normal | Verbosity::Verbose)
        && texts.len() > cli.chunk_size
        && !matches!(cli.format, OutputFormat::Json);
    let pb = if show_progress {
        Some(progress_bar_setup(texts.len(), "Classifying texts")?)
    } else {
        None
    };

    let mut results = Vec::with_capacity(texts.len());
    for (i, chunk) in texts.chunks(cli.chunk_size).enumerate() {
        let chunk_results = predictor
            .predict_batch(chunk)
            .with_context(|| format!("Failed to classify batch chunk {i}"))?;
        results.extend(chunk_results);
        if let Some(pb) = &pb {
            pb.inc(chunk.len() as u64);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Classification complete");
    }
    Ok(results)
}

/// Print normalized text and encoded ids without loading a model
fn run_normalize(input: &InputSource, config: &InferenceConfig) -> Result<()> {
    let normalizer = TextNormalizer::new(config.normalization);
    let vocabulary = config
        .vocabulary_path
        .as_ref()
        .map(|path| {
            Vocabulary::load(path)
                .with_context(|| format!("Failed to load vocabulary: {}", path.display()))
        })
        .transpose()?;

    let texts = match input {
        InputSource::Single(text) => std::slice::from_ref(text),
        InputSource::Batch(texts) => texts.as_slice(),
    };
    let normalized = normalizer.normalize_batch(texts);
    let encoded = vocabulary
        .as_ref()
        .map(|vocabulary| config.encoder_params().encode(&normalized, vocabulary));

    for (i, text) in normalized.iter().enumerate() {
        let ids = encoded.as_ref().map(|encoded| encoded[i].ids());
        let line = serde_json::json!({
            "normalized": text,
            "ids": ids,
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn output_result(result: &PredictionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Class => {
            println!("{}", i64::from(result.classification()));
        }
        OutputFormat::Probability => {
            println!("{:.4}", result.toxicity_score);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(result)?);
        }
        OutputFormat::Human => {
            let class_probability = if result.is_toxic {
                result.toxicity_score
            } else {
                1.0 - result.toxicity_score
            };
            let confidence = class_probability * 100.0;
            println!("Result: {}", result.classification());
            println!("Confidence: {confidence:.1}%");
        }
    }
    Ok(())
}

fn output_batch_results(results: &[PredictionResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(results)?);
        }
        _ => {
            for result in results {
                output_result(result, format)?;
            }
        }
    }
    Ok(())
}
