//! Font files available to the rasterizer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{CaptionError, CaptionResult};

/// Directories searched when neither explicit files nor a font directory are configured.
pub const SYSTEM_FONT_DIRS: [&str; 2] = ["/usr/share/fonts", "/usr/local/share/fonts"];

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

/// One font file held in memory.
#[derive(Clone, Debug)]
pub struct FontFace {
    /// File stem, used in diagnostics.
    pub label: String,
    pub path: Option<PathBuf>,
    /// Weight inferred from the file name (`Bold` = 700, ...).
    pub weight: f32,
    pub italic: bool,
    pub data: Arc<Vec<u8>>,
}

impl FontFace {
    pub fn from_bytes(label: impl Into<String>, data: Vec<u8>) -> Self {
        let label = label.into();
        Self {
            weight: infer_weight(&label),
            italic: infer_italic(&label),
            label,
            path: None,
            data: Arc::new(data),
        }
    }
}

/// Immutable set of font faces shared by every render unit.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    faces: Vec<FontFace>,
}

impl FontBook {
    pub fn new(faces: Vec<FontFace>) -> Self {
        Self { faces }
    }

    /// Load the given font files, in order.
    pub fn from_files(paths: &[PathBuf]) -> CaptionResult<Self> {
        let mut faces = Vec::with_capacity(paths.len());
        for path in paths {
            faces.push(load_face(path)?);
        }
        Ok(Self { faces })
    }

    /// Load every font file below `dir`, recursively, in sorted path order.
    pub fn from_dir(dir: &Path) -> CaptionResult<Self> {
        if !dir.is_dir() {
            return Err(CaptionError::validation(format!(
                "font directory '{}' does not exist",
                dir.display()
            )));
        }
        let mut paths = Vec::new();
        collect_font_files(dir, &mut paths)?;
        paths.sort();
        Self::from_files(&paths)
    }

    /// Resolve fonts in priority order: explicit files, then `font_dir`, then the system
    /// font directories that exist.
    pub fn discover(explicit: &[PathBuf], font_dir: Option<&Path>) -> CaptionResult<Self> {
        let book = if !explicit.is_empty() {
            Self::from_files(explicit)?
        } else if let Some(dir) = font_dir {
            Self::from_dir(dir)?
        } else {
            let mut faces = Vec::new();
            for dir in SYSTEM_FONT_DIRS.iter().map(Path::new).filter(|d| d.is_dir()) {
                faces.extend(Self::from_dir(dir)?.faces);
            }
            Self { faces }
        };
        if book.is_empty() {
            return Err(CaptionError::validation(
                "no font files found; pass font paths or set CAPTIONFLOW_FONT_DIR",
            ));
        }
        tracing::debug!(faces = book.len(), "font book ready");
        Ok(book)
    }

    pub fn faces(&self) -> &[FontFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn load_face(path: &Path) -> CaptionResult<FontFace> {
    let data = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_owned();
    let mut face = FontFace::from_bytes(label, data);
    face.path = Some(path.to_path_buf());
    Ok(face)
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>) -> CaptionResult<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read font dir '{}'", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("list font dir '{}'", dir.display()))?
            .path();
        if path.is_dir() {
            collect_font_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Weight from conventional file-name suffixes such as `-Bold` or `ExtraLight`.
pub(crate) fn infer_weight(label: &str) -> f32 {
    let l = label.to_ascii_lowercase();
    // Longer names first: `semibold` and `extrabold` also contain `bold`.
    const TABLE: [(&str, f32); 11] = [
        ("thin", 100.0),
        ("extralight", 200.0),
        ("ultralight", 200.0),
        ("light", 300.0),
        ("medium", 500.0),
        ("semibold", 600.0),
        ("demibold", 600.0),
        ("extrabold", 800.0),
        ("ultrabold", 800.0),
        ("black", 900.0),
        ("bold", 700.0),
    ];
    TABLE
        .iter()
        .find(|(name, _)| l.contains(name))
        .map_or(400.0, |&(_, w)| w)
}

pub(crate) fn infer_italic(label: &str) -> bool {
    let l = label.to_ascii_lowercase();
    l.contains("italic") || l.contains("oblique")
}

#[cfg(test)]
#[path = "../../tests/unit/text/fonts.rs"]
mod tests;
