use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use docx_rs::{Docx, Paragraph, Run};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScanError};

/// File format for the recognised text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    Markdown,
    /// Word document, one paragraph per non-blank line.
    Docx,
    Text,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "md",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Text => "txt",
        }
    }
}

/// Where one processed document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub image: PathBuf,
    pub document: PathBuf,
    pub format: DocumentFormat,
}

impl OutputPaths {
    pub fn new(dir: impl AsRef<Path>, base_name: &str, format: DocumentFormat) -> Self {
        let dir = dir.as_ref();
        Self {
            image: dir.join(format!("{}.png", base_name)),
            document: dir.join(format!("{}.{}", base_name, format.extension())),
            format,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `img` as a PNG, creating missing parent directories.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    info!(path = %path.display(), "saved rectified image");
    Ok(())
}

fn write_docx(text: &str, path: &Path) -> Result<()> {
    let doc = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .fold(Docx::new(), |doc, line| {
            doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
        });
    let file = fs::File::create(path)?;
    doc.build()
        .pack(file)
        .map_err(|e| ScanError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}

/// Write recognised text in `format`, creating missing parent directories.
pub fn save_document(text: &str, path: &Path, format: DocumentFormat) -> Result<()> {
    ensure_parent(path)?;
    match format {
        DocumentFormat::Markdown | DocumentFormat::Text => fs::write(path, text)?,
        DocumentFormat::Docx => write_docx(text, path)?,
    }
    info!(path = %path.display(), ?format, "saved document");
    Ok(())
}

/// The user's desktop: `$HOME/Desktop` when it exists, then whatever
/// `xdg-user-dir DESKTOP` reports, then `$HOME`, then the working directory.
pub fn default_output_dir() -> PathBuf {
    let home = std::env::var("HOME").ok().map(PathBuf::from);

    if let Some(home) = &home {
        let desktop = home.join("Desktop");
        if desktop.is_dir() {
            return desktop;
        }
    }

    if let Ok(output) = Command::new("xdg-user-dir").arg("DESKTOP").output() {
        if output.status.success() {
            let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !reported.is_empty() {
                debug!(dir = %reported, "desktop from xdg-user-dir");
                return PathBuf::from(reported);
            }
        }
    }

    home.unwrap_or_else(|| PathBuf::from("."))
}
