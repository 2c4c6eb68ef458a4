// ============================================================================
// Rasterization — shape algorithms and pixel-delta application
// ============================================================================
//
// All shape functions are pure: two gesture endpoints in, a PixelStore
// delta out. Every plotted coordinate is wrapped toroidally before it
// becomes a key, so strokes crossing the canvas edge continue seamlessly
// on the opposite edge (required for tile mode, and for coordinate safety
// in general — the wrap is unconditional).

use crate::canvas::{wrap_coord, CanvasState, LayerNode, PixelStore, Rgb};
use crate::components::layers;

/// Drawing tools that produce a shape delta from a two-point gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeTool {
    Pencil,
    Brush,
    Eraser,
    Line,
    Rectangle,
    Circle,
}

/// Whether a pixel delta paints into or deletes from the layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    Draw,
    Erase,
}

/// Rasterize a tool gesture from `(x0, y0)` to `(x1, y1)`.
///
/// Pencil/Brush/Eraser/Line walk a Bresenham line and stamp a
/// `brush_size`-square at each visited point; Rectangle fills the whole
/// bounding box inclusive; Circle runs the midpoint algorithm around the
/// gesture's midpoint with radius = half the endpoint distance.
pub fn shape_pixels(
    tool: ShapeTool,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: Rgb,
    brush_size: u32,
    width: u32,
    height: u32,
) -> PixelStore {
    let mut out = PixelStore::new();
    match tool {
        ShapeTool::Pencil | ShapeTool::Brush | ShapeTool::Eraser | ShapeTool::Line => {
            bresenham_line(x0, y0, x1, y1, &mut |x, y| {
                stamp(&mut out, x, y, color, brush_size, width, height);
            });
        }
        ShapeTool::Rectangle => {
            for y in y0.min(y1)..=y0.max(y1) {
                for x in x0.min(x1)..=x0.max(x1) {
                    stamp(&mut out, x, y, color, brush_size, width, height);
                }
            }
        }
        ShapeTool::Circle => {
            let cx = (x0 + x1).div_euclid(2);
            let cy = (y0 + y1).div_euclid(2);
            let dx = (x1 - x0) as f64;
            let dy = (y1 - y0) as f64;
            let r = ((dx * dx + dy * dy).sqrt() / 2.0).floor() as i64;
            midpoint_circle(cx, cy, r, &mut |x, y| {
                stamp(&mut out, x, y, color, brush_size, width, height);
            });
        }
    }
    out
}

/// Stamp a `size`-square centered on `(x, y)` (offset by `size / 2`, so a
/// size-1 stamp is the single pixel itself), wrapping each cell.
fn stamp(out: &mut PixelStore, x: i64, y: i64, color: Rgb, size: u32, width: u32, height: u32) {
    let size = size.max(1) as i64;
    let offset = size / 2;
    for dy in -offset..(size - offset) {
        for dx in -offset..(size - offset) {
            let key = (wrap_coord(x + dx, width), wrap_coord(y + dy, height));
            out.set(key, color);
        }
    }
}

/// Integer Bresenham line walk, visiting both endpoints.
fn bresenham_line(x0: i64, y0: i64, x1: i64, y1: i64, plot: &mut impl FnMut(i64, i64)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Midpoint circle: plots the eight symmetric points per step.
fn midpoint_circle(cx: i64, cy: i64, r: i64, plot: &mut impl FnMut(i64, i64)) {
    if r <= 0 {
        plot(cx, cy);
        return;
    }
    let mut x = 0i64;
    let mut y = r;
    let mut d = 3 - 2 * r;
    while y >= x {
        plot(cx + x, cy + y);
        plot(cx - x, cy + y);
        plot(cx + x, cy - y);
        plot(cx - x, cy - y);
        plot(cx + y, cy + x);
        plot(cx - y, cy + x);
        plot(cx + y, cy - x);
        plot(cx - y, cy - x);
        x += 1;
        if d > 0 {
            y -= 1;
            d += 4 * (x - y) + 10;
        } else {
            d += 4 * x + 6;
        }
    }
}

// ============================================================================
// Delta application
// ============================================================================

/// Apply a pixel delta to the active layer of the current frame.
///
/// Returns the new layer tree, or `None` when the whole call is a no-op:
/// the active layer is missing, locked, or hidden. Per-pixel rules:
/// out-of-bounds coordinates are dropped, coordinates outside an active
/// selection are dropped, and mirror axes write the mirrored counterparts
/// (each independently re-checked against the selection; mirrors of an
/// in-bounds key are in bounds by construction).
pub fn apply_to_layer(
    state: &CanvasState,
    delta: &PixelStore,
    mode: ApplyMode,
) -> Option<Vec<LayerNode>> {
    let layer = state.active_layer()?;
    if layer.locked || !layer.visible {
        return None;
    }

    let mut pixels = layer.pixels.clone();
    for (key, color) in delta.iter() {
        // Bounds first: mirror counterparts subtract from width/height - 1,
        // so an out-of-bounds key must be dropped before any mirror math
        if !in_bounds(key, state.width, state.height) {
            continue;
        }
        for target in mirror_targets(key, state) {
            if let Some(sel) = &state.selection
                && !sel.contains(target.0 as i32, target.1 as i32)
            {
                continue;
            }
            match mode {
                ApplyMode::Draw => pixels.set(target, color),
                ApplyMode::Erase => pixels.remove(target),
            }
        }
    }

    Some(layers::replace_pixels(
        &state.current_frame().layers,
        state.active_layer_id,
        pixels,
    ))
}

fn in_bounds(key: (u32, u32), width: u32, height: u32) -> bool {
    key.0 < width && key.1 < height
}

/// The point itself plus its mirror-axis counterparts. Coincident mirrors
/// (odd-width center column) collapse into a single write via the key set.
fn mirror_targets(key: (u32, u32), state: &CanvasState) -> Vec<(u32, u32)> {
    let (x, y) = key;
    let mut targets = vec![(x, y)];
    let mx = state.width - 1 - x;
    let my = state.height - 1 - y;
    if state.mirror_x && !targets.contains(&(mx, y)) {
        targets.push((mx, y));
    }
    if state.mirror_y && !targets.contains(&(x, my)) {
        targets.push((x, my));
    }
    if state.mirror_x && state.mirror_y && !targets.contains(&(mx, my)) {
        targets.push((mx, my));
    }
    targets
}

// ============================================================================
// Spray
// ============================================================================

/// Scatter points for one spray tick around `(cx, cy)`.
///
/// `3 × brush_size` points inside a disc of radius `brush_size + 2`,
/// sampled with a uniform angle and a uniform radius. The radial sample is
/// deliberately not area-uniform — density biases toward the center, and
/// that distribution is an established, observable behavior.
///
/// Placement is driven by a deterministic coordinate hash (no RNG), so a
/// given `(center, seed)` always scatters identically.
pub fn spray_pixels(
    cx: i64,
    cy: i64,
    color: Rgb,
    brush_size: u32,
    seed: u32,
    width: u32,
    height: u32,
) -> PixelStore {
    let count = 3 * brush_size.max(1);
    let radius = (brush_size.max(1) + 2) as f64;
    let mut out = PixelStore::new();
    for i in 0..count {
        let a = scatter_hash(cx, cy, seed.wrapping_add(2 * i)) as f64 / u32::MAX as f64;
        let r = scatter_hash(cx, cy, seed.wrapping_add(2 * i + 1)) as f64 / u32::MAX as f64;
        let angle = a * std::f64::consts::TAU;
        let dist = r * radius;
        // Offsets floor toward negative infinity, not round to nearest
        let px = (cx as f64 + angle.cos() * dist).floor() as i64;
        let py = (cy as f64 + angle.sin() * dist).floor() as i64;
        out.set((wrap_coord(px, width), wrap_coord(py, height)), color);
    }
    out
}

/// Deterministic integer hash over a coordinate and a counter.
fn scatter_hash(x: i64, y: i64, counter: u32) -> u32 {
    let mut h = (x as u32)
        .wrapping_mul(374_761_393)
        ^ (y as u32).wrapping_mul(668_265_263)
        ^ counter.wrapping_mul(1_013_904_223);
    h ^= h >> 13;
    h = h.wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    h
}

// ============================================================================
// Tests
// ============================================================================
