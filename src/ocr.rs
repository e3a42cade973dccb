use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use image::RgbImage;
use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::error::{Result, ScanError};

/// One recognised line of text and the vertical position of its box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f32,
    pub text: String,
}

impl TextLine {
    pub fn new(y: f32, text: impl Into<String>) -> Self {
        Self {
            y,
            text: text.into(),
        }
    }
}

/// Anything able to read text off a rectified document image.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &RgbImage) -> Result<Vec<TextLine>>;
}

/// Sort lines top to bottom and join them with newlines. Lines at the same
/// height keep their recognition order.
pub fn assemble_text(mut lines: Vec<TextLine>) -> String {
    lines.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal));
    lines
        .into_iter()
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct SuryaPage {
    #[serde(default)]
    text_lines: Vec<SuryaLine>,
}

#[derive(Debug, Deserialize)]
struct SuryaLine {
    #[serde(default)]
    text: String,
    #[serde(default)]
    bbox: Vec<f32>,
}

/// Parse a surya `results.json` document and collect the lines stored under `key`.
pub fn parse_results(json: &str, key: &str) -> Result<Vec<TextLine>> {
    let mut results: HashMap<String, Vec<SuryaPage>> =
        serde_json::from_str(json)
            .map_err(|e| ScanError::TextExtraction(format!("malformed OCR results: {}", e)))?;
    let pages = results
        .remove(key)
        .ok_or_else(|| ScanError::TextExtraction(format!("no OCR results for key {}", key)))?;

    let lines = pages
        .into_iter()
        .flat_map(|page| page.text_lines)
        .filter_map(|line| {
            let text = line.text.trim();
            if text.is_empty() {
                return None;
            }
            let y = line.bbox.get(1).copied().unwrap_or(0.0);
            Some(TextLine::new(y, text))
        })
        .collect();
    Ok(lines)
}

/// Runs the `surya_ocr` command-line recogniser on a temporary PNG.
#[derive(Debug, Clone)]
pub struct SuryaOcr {
    pub program: String,
}

impl Default for SuryaOcr {
    fn default() -> Self {
        Self {
            program: "surya_ocr".to_string(),
        }
    }
}

impl SuryaOcr {
    const INPUT_STEM: &'static str = "document";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, input: &Path, output_dir: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .arg(input)
            .arg("--output_dir")
            .arg(output_dir)
            .output()
            .map_err(|e| {
                ScanError::TextExtraction(format!("failed to execute {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::TextExtraction(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl TextExtractor for SuryaOcr {
    #[instrument(skip_all, fields(program = %self.program))]
    fn extract_text(&self, image: &RgbImage) -> Result<Vec<TextLine>> {
        let workdir = TempDir::new()
            .map_err(|e| ScanError::TextExtraction(format!("failed to create workdir: {}", e)))?;
        let input = workdir.path().join(format!("{}.png", Self::INPUT_STEM));
        image
            .save_with_format(&input, image::ImageFormat::Png)
            .map_err(|e| ScanError::TextExtraction(format!("failed to stage image: {}", e)))?;

        let output_dir = workdir.path().join("results");
        self.run(&input, &output_dir)?;

        let results_file = output_dir.join(Self::INPUT_STEM).join("results.json");
        if !results_file.exists() {
            return Err(ScanError::TextExtraction(format!(
                "results file not found at {}",
                results_file.display()
            )));
        }
        let json = std::fs::read_to_string(&results_file).map_err(|e| {
            ScanError::TextExtraction(format!("failed to read {}: {}", results_file.display(), e))
        })?;
        let lines = parse_results(&json, Self::INPUT_STEM)?;
        debug!(lines = lines.len(), "OCR results parsed");
        info!("text extraction finished");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "document": [
            {
                "text_lines": [
                    {"text": "  second line ", "bbox": [4.0, 40.0, 90.0, 52.0], "confidence": 0.9},
                    {"text": "   ", "bbox": [4.0, 10.0, 90.0, 20.0]},
                    {"text": "first line", "bbox": [4.0, 12.5, 90.0, 24.0]}
                ],
                "page": 1
            },
            {
                "text_lines": [
                    {"text": "third", "bbox": [4.0, 80.0, 90.0, 95.0]}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_results_skips_blank_lines() {
        let lines = parse_results(SAMPLE, "document").unwrap();
        assert_eq!(
            lines,
            vec![
                TextLine::new(40.0, "second line"),
                TextLine::new(12.5, "first line"),
                TextLine::new(80.0, "third"),
            ]
        );
    }

    #[test]
    fn test_parse_results_missing_key() {
        let err = parse_results(SAMPLE, "other").unwrap_err();
        assert!(matches!(err, ScanError::TextExtraction(_)));
        assert!(parse_results("not json", "document").is_err());
    }

    #[test]
    fn test_assemble_text_orders_by_height() {
        let lines = vec![
            TextLine::new(40.0, "b"),
            TextLine::new(10.0, "a"),
            TextLine::new(40.0, "c"),
        ];
        assert_eq!(assemble_text(lines), "a\nb\nc");
        assert_eq!(assemble_text(Vec::new()), "");
    }

    #[test]
    fn test_missing_program_is_extraction_error() {
        let ocr = SuryaOcr::new("docscan-no-such-ocr-binary");
        let err = ocr.extract_text(&RgbImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, ScanError::TextExtraction(_)));
    }

    /// Install an executable shell script standing in for the recogniser.
    #[cfg(unix)]
    fn fake_recogniser(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("surya_ocr");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_recogniser_and_reads_results() {
        let bin = tempfile::tempdir().unwrap();
        // Fails unless called as `<png> --output_dir <dir>` on a staged PNG
        let script = r#"
[ "$2" = "--output_dir" ] || { echo "bad arguments: $*" >&2; exit 2; }
[ -s "$1" ] || { echo "missing input $1" >&2; exit 3; }
stem=$(basename "$1" .png)
mkdir -p "$3/$stem"
printf '%s' "{\"$stem\": [{\"text_lines\": [
  {\"text\": \"Total 9.99\", \"bbox\": [3, 70, 60, 80]},
  {\"text\": \"  \", \"bbox\": [3, 40, 60, 50]},
  {\"text\": \" Corner Shop \", \"bbox\": [3, 5, 60, 15]}
]}]}" > "$3/$stem/results.json"
"#;
        let ocr = SuryaOcr::new(fake_recogniser(bin.path(), script));
        let lines = ocr.extract_text(&RgbImage::new(8, 8)).unwrap();
        assert_eq!(
            lines,
            vec![TextLine::new(70.0, "Total 9.99"), TextLine::new(5.0, "Corner Shop")]
        );
        assert_eq!(assemble_text(lines), "Corner Shop\nTotal 9.99");
    }

    #[cfg(unix)]
    #[test]
    fn test_recogniser_failure_carries_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let script = "echo 'model weights missing' >&2\nexit 1";
        let ocr = SuryaOcr::new(fake_recogniser(bin.path(), script));
        match ocr.extract_text(&RgbImage::new(8, 8)) {
            Err(ScanError::TextExtraction(msg)) => {
                assert!(msg.contains("model weights missing"), "{}", msg)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_results_file_is_extraction_error() {
        let bin = tempfile::tempdir().unwrap();
        let ocr = SuryaOcr::new(fake_recogniser(bin.path(), "exit 0"));
        let err = ocr.extract_text(&RgbImage::new(8, 8)).unwrap_err();
        assert!(matches!(err, ScanError::TextExtraction(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_results_is_extraction_error() {
        let bin = tempfile::tempdir().unwrap();
        // results.json exists but is a directory
        let script = "mkdir -p \"$3/document/results.json\"";
        let ocr = SuryaOcr::new(fake_recogniser(bin.path(), script));
        match ocr.extract_text(&RgbImage::new(8, 8)) {
            Err(ScanError::TextExtraction(msg)) => assert!(msg.contains("failed to read"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
