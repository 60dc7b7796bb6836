use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use futures::{StreamExt, stream};
use snafu::ResultExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pestcount_core::{
    BeneficialList, DetectionOutput, DetectorConfig, InsectClassifier, LabelSet, Pipeline,
    SharedPipeline,
    consts::INTRA_THREADS,
    error::{ImageReadSnafu, PestCountError},
    inference::{
        detector::{OrtInvoker, PestDetector},
        model::{Invoker, session_builder},
    },
    render::Annotator,
};

/// Photos decoded at once; inference itself is serialized by the pipeline.
const MAX_PHOTOS_IN_FLIGHT: usize = 2;

#[derive(Parser)]
#[command(name = "pestcount")]
#[command(about = "Count pest insects in photos with an on-device detection model")]
struct Args {
    #[arg(required = true, help = "Photos to analyze")]
    images: Vec<PathBuf>,

    #[arg(short, long, help = "Detection model (.onnx)")]
    model: PathBuf,

    #[arg(short, long, help = "Label file, one class name per line")]
    labels: Option<PathBuf>,

    #[arg(short, long, help = "JSON config overriding detector defaults")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Confidence threshold override")]
    threshold: Option<f32>,

    #[arg(short, long, help = "Directory for annotated photos")]
    output: Option<PathBuf>,

    #[arg(long, help = "TrueType font used for box labels")]
    font: Option<PathBuf>,

    #[arg(long, help = "Print the per-label breakdown as JSON")]
    json: bool,
}

fn load_config(args: &Args) -> Result<DetectorConfig, PestCountError> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.proba_threshold = threshold;
        config.validate()?;
    }
    Ok(config)
}

fn load_labels(args: &Args, config: &DetectorConfig) -> LabelSet {
    let labels = match &args.labels {
        Some(path) => LabelSet::load_or_default(path),
        None => LabelSet::default(),
    };
    labels.with_unknown(config.unknown_label.clone())
}

fn print_summary(path: &Path, output: &DetectionOutput, classifier: &dyn InsectClassifier) {
    let count = &output.count;
    println!("\n=== {} ===", path.display());
    println!("Total Insects Detected: {}", count.total_detections);
    println!("Pests: {}", count.pest_count(classifier));
    println!("Severity: {}", count.severity.name());
    println!("{}", count.summary());
}

fn annotated_path(output_dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{}-count.jpg", stem))
}

/// Decodes, counts and reports one photo; the photo is dropped once its
/// annotated copy is written.
async fn analyze<I>(
    pipeline: &SharedPipeline<I>,
    path: &Path,
    args: &Args,
    annotator: &Annotator<'_>,
) -> Result<(), PestCountError>
where
    I: Invoker + Send + 'static,
{
    let image = Arc::new(image::open(path).context(ImageReadSnafu {
        path: path.to_string_lossy(),
    })?);
    let output = pipeline.detect(Arc::clone(&image)).await?;

    print_summary(path, &output, annotator.classifier());
    if args.json {
        println!("{}", output.count.breakdown_json()?);
    }

    if let Some(dir) = &args.output {
        let target = annotated_path(dir, path);
        annotator.save(&image, &output.detections, &target)?;
        info!("Annotated photo saved to {}", target.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let labels = load_labels(&args, &config);
    info!(
        labels = labels.len(),
        threshold = config.proba_threshold,
        iou = config.iou_threshold,
        "Configuration loaded"
    );

    let detector = PestDetector::from_file(&args.model, config.clone())?;
    let invoker = OrtInvoker::new(session_builder(INTRA_THREADS)?, &detector)?;
    drop(detector);

    let pipeline = SharedPipeline::new(Pipeline::new(invoker, labels.clone(), config));

    let classifier = BeneficialList::default();
    let mut annotator = Annotator::new(&labels, &classifier);
    if let Some(font) = &args.font {
        annotator = annotator.with_font_file(font)?;
    }
    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)?;
    }

    let (args, annotator) = (&args, &annotator);
    let results: Vec<_> = stream::iter(&args.images)
        .map(|path| {
            let pipeline = pipeline.clone();
            async move {
                let result = analyze(&pipeline, path, args, annotator).await;
                (path, result)
            }
        })
        .buffer_unordered(MAX_PHOTOS_IN_FLIGHT)
        .collect()
        .await;

    let mut failures = 0;
    for (path, result) in results {
        if let Err(err) = result {
            // Distinct from a successful pass that found nothing
            error!("Analysis failed for {}: {}", path.display(), err);
            failures += 1;
        }
    }

    if failures > 0 {
        warn!("{} of {} photos could not be analyzed", failures, args.images.len());
        return Err(format!("{} photo(s) failed", failures).into());
    }

    Ok(())
}
