//! Format conversion through an external LibreOffice binary.
//!
//! The renderer is driven headless:
//!
//! ```text
//! <program> <extra args> --invisible --norestore --convert-to <ext> <source> --outdir <dir>
//! ```
//!
//! It writes `<dir>/<source stem>.<ext>`, which is then moved to the
//! requested target path. The call blocks until the renderer exits.
//!
//! # Example
//!
//! ```rust,no_run
//! use quince::convert::{Converter, ConverterConfig};
//!
//! let converter = Converter::new(ConverterConfig::default());
//! converter.transform("deck.pptx", "deck.pdf")?;
//! # Ok::<(), quince::common::Error>(())
//! ```
use crate::common::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const SOURCE_EXTENSIONS: &[&str] = &["ppt", "pptx", "odp"];
const TARGET_EXTENSIONS: &[&str] = &["ppt", "pptx", "pdf", "odp"];

/// Where and how to run the renderer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterConfig {
    /// Renderer executable, looked up on `PATH` when not absolute
    pub program: PathBuf,
    /// Arguments placed before the conversion flags
    pub extra_args: Vec<String>,
    /// `HOME` for the child process; LibreOffice keeps its profile there
    pub home_dir: Option<PathBuf>,
    /// Output directory handed to `--outdir`. Defaults to the source's directory.
    pub out_dir: Option<PathBuf>,
    /// Inherit the renderer's stdout and stderr instead of discarding them
    pub debug: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("soffice"),
            extra_args: Vec::new(),
            home_dir: None,
            out_dir: None,
            debug: false,
        }
    }
}

impl ConverterConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert `source` into `target`, picking formats from the extensions.
    ///
    /// Sources may be `ppt`, `pptx` or `odp`; targets may also be `pdf`.
    pub fn transform(&self, source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();
        let target = target.as_ref();
        let (from, to) = (extension(source), extension(target));
        if !SOURCE_EXTENSIONS.contains(&from.as_str()) || !TARGET_EXTENSIONS.contains(&to.as_str()) {
            return Err(Error::UnsupportedFormatConversion { from, to });
        }

        let out_dir = match &self.config.out_dir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.extra_args)
            .args(["--invisible", "--norestore", "--convert-to", to.as_str()])
            .arg(source)
            .arg("--outdir")
            .arg(&out_dir);
        if let Some(home) = &self.config.home_dir {
            command.env("HOME", home);
        }
        if !self.config.debug {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        tracing::debug!(program = %self.config.program.display(), source = %source.display(), %to, "running converter");
        let status = command.status()?;
        if !status.success() {
            tracing::warn!(%status, source = %source.display(), "converter failed");
            return Err(Error::ConversionFailed {
                status: status.to_string(),
            });
        }

        let stem = source
            .file_stem()
            .ok_or_else(|| Error::Other(format!("source has no file name: {}", source.display())))?;
        let mut produced = out_dir.join(stem);
        produced.set_extension(&to);
        if produced != target {
            move_file(&produced, target)?;
        }
        tracing::info!(source = %source.display(), target = %target.display(), "converted");
        Ok(())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}
