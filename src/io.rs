// ============================================================================
// PXF PROJECT FILE FORMAT — bincode project records on disk
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{clamp_dimension, CanvasState, Frame, DEFAULT_FPS};
use crate::components::colors::DEFAULT_PALETTE;
use crate::components::layers;
use crate::compositor;
use crate::log_warn;

/// Magic header for the current format.
const PXF_MAGIC_V1: &str = "PXF1";

/// Longest edge of the stored preview thumbnail.
const THUMBNAIL_EDGE: u32 = 64;

/// Serializable project record — the shape persisted to `.pxf` files.
///
/// `frames` and `palette` are optional on load: older or partial records
/// get a default frame / the default palette substituted.
#[derive(Serialize, Deserialize)]
pub struct ProjectRecord {
    magic: String,
    pub id: Uuid,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frames: Option<Vec<Frame>>,
    pub palette: Option<Vec<String>>,
    /// Unix seconds of the last save.
    pub last_modified: u64,
    /// PNG-encoded preview of the first frame.
    pub thumbnail: Option<Vec<u8>>,
    pub fps: u32,
}

/// Error type for PXF file operations
#[derive(Debug)]
pub enum PxfError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for PxfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PxfError::Io(e) => write!(f, "I/O error: {}", e),
            PxfError::Serialize(e) => write!(f, "Serialization error: {}", e),
            PxfError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for PxfError {}

impl From<std::io::Error> for PxfError {
    fn from(e: std::io::Error) -> Self {
        PxfError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for PxfError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        PxfError::Serialize(e.to_string())
    }
}

/// Build the serializable record for a canvas state, stamping the current
/// time and a fresh thumbnail.
pub fn build_record(state: &CanvasState, id: Uuid, name: &str) -> ProjectRecord {
    ProjectRecord {
        magic: PXF_MAGIC_V1.to_string(),
        id,
        name: name.to_string(),
        width: state.width,
        height: state.height,
        frames: Some(state.frames.clone()),
        palette: Some(state.palette.clone()),
        last_modified: unix_now(),
        thumbnail: encode_thumbnail(state),
        fps: state.fps,
    }
}

/// Save a record as a `.pxf` file.
pub fn save_pxf(record: &ProjectRecord, path: &Path) -> Result<(), PxfError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, record)?;
    Ok(())
}

/// Load a `.pxf` project file.
pub fn load_pxf(path: &Path) -> Result<ProjectRecord, PxfError> {
    let raw = std::fs::read(path)?;
    decode_pxf(&raw)
}

/// Decode record bytes, verifying the magic header first.
pub fn decode_pxf(raw: &[u8]) -> Result<ProjectRecord, PxfError> {
    if raw.len() < 12 {
        return Err(PxfError::InvalidFormat("File too small".into()));
    }

    // bincode encodes a String as: 8-byte length prefix + UTF-8 data.
    // The magic string is 4 chars, so bytes 8..12 hold the magic.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != PXF_MAGIC_V1 {
        return Err(PxfError::InvalidFormat(format!("Unknown magic '{}'", magic)));
    }

    Ok(bincode::deserialize(raw)?)
}

/// Reconstitute editing state from a loaded record.
///
/// Tolerant by design: missing or empty frames become one default frame
/// with one default layer, a missing palette becomes the default palette,
/// and out-of-range dimensions are clamped.
pub fn record_to_state(record: &ProjectRecord) -> CanvasState {
    let mut frames = record.frames.clone().unwrap_or_default();
    if frames.is_empty() {
        frames = vec![Frame::new()];
    }

    let active_layer_id = layers::first_leaf_id(&frames[0].layers).unwrap_or_else(|| {
        // A frame with no paintable leaf gets a fresh default tree
        frames[0] = Frame::new();
        frames[0].layers[0].id()
    });

    let palette = match &record.palette {
        Some(p) if !p.is_empty() => p.clone(),
        _ => DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
    };

    let mut state = CanvasState::new(record.width, record.height);
    state.width = clamp_dimension(record.width);
    state.height = clamp_dimension(record.height);
    state.frames = frames;
    state.current_frame_index = 0;
    state.active_layer_id = active_layer_id;
    state.palette = palette;
    state.fps = if record.fps == 0 { DEFAULT_FPS } else { record.fps };
    state
}

/// PNG-encode a small preview of the first frame. Returns `None` when
/// encoding fails — a record without a thumbnail is still valid.
pub fn encode_thumbnail(state: &CanvasState) -> Option<Vec<u8>> {
    let full = compositor::draw_frame(state.width, state.height, &state.frames[0].layers);
    let longest = state.width.max(state.height);
    let img = if longest > THUMBNAIL_EDGE {
        let scale = THUMBNAIL_EDGE as f32 / longest as f32;
        let nw = ((state.width as f32 * scale).round() as u32).max(1);
        let nh = ((state.height as f32 * scale).round() as u32).max(1);
        image::imageops::resize(&full, nw, nh, image::imageops::FilterType::Nearest)
    } else {
        full
    };

    let mut png = Vec::new();
    let encoder = PngEncoder::new(&mut png);
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), image::ColorType::Rgba8)
        .ok()?;
    Some(png)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ============================================================================
// Projects directory
// ============================================================================

/// Platform projects directory:
///
/// `%APPDATA%\PixelFE\projects\`       (Windows)
/// `~/.local/share/PixelFE/projects/`  (Linux)
/// `~/Library/Application Support/PixelFE/projects/`  (macOS)
pub fn projects_dir() -> PathBuf {
    crate::logger::data_dir().join("PixelFE").join("projects")
}

/// Lightweight listing entry for the project gallery.
pub struct ProjectSummary {
    pub path: PathBuf,
    pub id: Uuid,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    pub last_modified: u64,
    pub fps: u32,
}

/// List all `.pxf` files in a directory, newest first. Unreadable files
/// are skipped with a warning rather than failing the whole listing.
pub fn list_projects(dir: &Path) -> Result<Vec<ProjectSummary>, PxfError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pxf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pxf"));
        if !is_pxf {
            continue;
        }
        match load_pxf(&path) {
            Ok(record) => out.push(ProjectSummary {
                path,
                id: record.id,
                name: record.name.clone(),
                width: record.width,
                height: record.height,
                frame_count: record.frames.as_ref().map_or(0, |f| f.len()),
                last_modified: record.last_modified,
                fps: record.fps,
            }),
            Err(e) => {
                log_warn!("Skipping unreadable project {}: {}", path.display(), e);
            }
        }
    }
    out.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
