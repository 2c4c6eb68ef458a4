// ============================================================================
// PixelFE CLI — headless project export via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelfe --input art.pxf --output art.png
//   pixelfe -i art.pxf --frame 2 -o frame2.png
//   pixelfe -i "sprites/*.pxf" --all-frames --output-dir renders/ --scale 8
//   pixelfe --list
//
// All processing runs synchronously on the current thread; the only
// output format is PNG (animation collaborators consume the per-frame
// rasters).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::compositor;
use crate::io::{self, load_pxf, record_to_state};
use crate::log_info;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelFE headless project renderer.
///
/// Render .pxf project files to PNG images — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "pixelfe",
    about = "PixelFE headless project renderer",
    long_about = "Render PixelFE project files (.pxf) to flattened PNG images.\n\n\
                  Example:\n  \
                  pixelfe --input art.pxf --output art.png\n  \
                  pixelfe -i \"sprites/*.pxf\" --all-frames --output-dir renders/ --scale 8"
)]
pub struct CliArgs {
    /// Input .pxf file(s). Glob patterns accepted (e.g. "sprites/*.pxf").
    #[arg(short, long, num_args = 1.., required_unless_present = "list")]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file, single-frame output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch or multi-frame export.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Frame index to render (0-based). Defaults to frame 0.
    #[arg(long, value_name = "N", conflicts_with = "all_frames")]
    pub frame: Option<usize>,

    /// Export every frame as <stem>_f<NNN>.png.
    #[arg(long)]
    pub all_frames: bool,

    /// Integer nearest-neighbor upscale factor (pixel art stays crisp).
    #[arg(long, default_value_t = 1, value_name = "FACTOR")]
    pub scale: u32,

    /// List the projects directory instead of rendering.
    #[arg(long)]
    pub list: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list {
        return run_list();
    }

    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs (or whole-animation export) need a directory target
    if (inputs.len() > 1 || args.all_frames) && args.output.is_some() {
        eprintln!(
            "error: --output only accepts a single file path.\n\
             Use --output-dir for batch or --all-frames export."
        );
        return ExitCode::FAILURE;
    }

    if args.scale == 0 {
        eprintln!("error: --scale must be at least 1.");
        return ExitCode::FAILURE;
    }

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        match run_one(input_path, &args) {
            Ok(written) => {
                log_info!("Rendered {} ({} file(s))", input_path.display(), written.len());
                if args.verbose || multi {
                    for out in &written {
                        println!(
                            "  → {} ({:.0}ms)",
                            out.display(),
                            file_start.elapsed().as_secs_f64() * 1000.0
                        );
                    }
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_list() -> ExitCode {
    let dir = io::projects_dir();
    let projects = match io::list_projects(&dir) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if projects.is_empty() {
        println!("No projects in {}", dir.display());
        return ExitCode::SUCCESS;
    }
    for p in projects {
        println!(
            "{:<24} {:>3}×{:<3} {:>3} frame(s) @{:<2}fps  {}",
            p.name,
            p.width,
            p.height,
            p.frame_count,
            p.fps,
            p.path.display()
        );
    }
    ExitCode::SUCCESS
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, args: &CliArgs) -> Result<Vec<PathBuf>, String> {
    // -- Step 1: Load ----------------------------------------------------
    let record = load_pxf(input).map_err(|e| format!("load failed: {}", e))?;
    let state = record_to_state(&record);

    // -- Step 2: Render + save -------------------------------------------
    let mut written = Vec::new();
    if args.all_frames {
        for (idx, frame) in state.frames.iter().enumerate() {
            let img = scaled_frame(&state, &frame.layers, args.scale);
            let path = frame_output_path(input, args.output_dir.as_deref(), idx)
                .ok_or_else(|| "cannot determine output path".to_string())?;
            img.save(&path).map_err(|e| format!("save failed: {}", e))?;
            written.push(path);
        }
    } else {
        let idx = args.frame.unwrap_or(0);
        let frame = state
            .frames
            .get(idx)
            .ok_or_else(|| format!("frame {} out of range (project has {})", idx, state.frames.len()))?;
        let img = scaled_frame(&state, &frame.layers, args.scale);
        let path = build_output_path(input, args.output.as_deref(), args.output_dir.as_deref())
            .ok_or_else(|| "cannot determine output path".to_string())?;
        img.save(&path).map_err(|e| format!("save failed: {}", e))?;
        written.push(path);
    }
    Ok(written)
}

fn scaled_frame(
    state: &crate::canvas::CanvasState,
    layers: &[crate::canvas::LayerNode],
    scale: u32,
) -> image::RgbaImage {
    let img = compositor::draw_frame(state.width, state.height, layers);
    if scale <= 1 {
        return img;
    }
    image::imageops::resize(
        &img,
        state.width * scale,
        state.height * scale,
        image::imageops::FilterType::Nearest,
    )
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single-frame export.
///
/// Priority: explicit `--output`, then `--output-dir` with the input
/// stem, then next to the input file with a `.png` extension.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}.png", stem)))
}

/// Output path for one frame of an `--all-frames` export.
fn frame_output_path(input: &Path, output_dir: Option<&Path>, frame: usize) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let name = format!("{}_f{:03}.png", stem, frame);
    match output_dir {
        Some(dir) => Some(dir.join(name)),
        None => Some(input.parent().unwrap_or(Path::new(".")).join(name)),
    }
}

// ============================================================================
// Tests
// ============================================================================
