use clap::{Parser, ValueEnum};
use docscan::{
    default_output_dir, DocumentFormat, DocumentScanner, OutputPaths, ScanConfig,
    SelectionStrategy, SuryaOcr, TextExtractor,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Detect a document in a photo, flatten it and extract its text", long_about = None)]
struct Cli {
    /// Input image path
    image: PathBuf,

    /// Format of the text document
    #[arg(long, value_enum, default_value_t = OutputFormat::Md)]
    output_format: OutputFormat,

    /// Directory for the outputs (defaults to the desktop)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name, without extension, shared by the outputs
    #[arg(long, default_value = "processed_document")]
    base_name: String,

    /// JSON file overriding the scan configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quadrilateral search strategy (overrides the configuration file)
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Only write the rectified image
    #[arg(long)]
    no_ocr: bool,

    /// OCR program to run on the rectified image
    #[arg(long, default_value = "surya_ocr")]
    ocr_program: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Markdown
    Md,
    /// Word document
    Docx,
    /// Plain text
    Txt,
}

impl From<OutputFormat> for DocumentFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Md => DocumentFormat::Markdown,
            OutputFormat::Docx => DocumentFormat::Docx,
            OutputFormat::Txt => DocumentFormat::Text,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// First quadrilateral among the largest contours
    Greedy,
    /// Largest quadrilateral among the largest contours
    LargestArea,
}

impl From<Strategy> for SelectionStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Greedy => SelectionStrategy::Greedy,
            Strategy::LargestArea => SelectionStrategy::LargestArea,
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.detect.strategy = strategy.into();
    }

    let scanner = DocumentScanner::new(config)?;
    let output_dir = cli.output_dir.unwrap_or_else(default_output_dir);
    let paths = OutputPaths::new(&output_dir, &cli.base_name, cli.output_format.into());

    let ocr = SuryaOcr::new(cli.ocr_program);
    let extractor: Option<&dyn TextExtractor> = if cli.no_ocr { None } else { Some(&ocr) };

    let processed = scanner.process(&cli.image, extractor, &paths)?;

    println!("Processed image saved to: {}", processed.image_path.display());
    if let Some(document) = processed.document_path {
        println!("Document saved to: {}", document.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
