// ============================================================================
// Selection engine — lift, move, transform, merge-back
// ============================================================================
//
// Lifecycle: a marquee drag commits a normalized rectangle; the first move
// or transform lifts the rectangle's pixels out of the active layer into
// the selection's floating buffer (at most once per selection lifetime —
// keyed strictly to the existence of the buffer); moves accumulate a live
// drag offset committed on release; deselect merges the buffer back, with
// floating pixels winning on key collision.

use crate::canvas::{CanvasState, LayerNode, PixelStore, Selection};
use crate::components::layers;

/// Flip/rotate operations on the selected pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTransform {
    FlipH,
    FlipV,
    Rotate90,
}

/// Cut the active layer's pixels inside the selection rectangle into the
/// floating buffer.
///
/// Returns the updated layer tree and selection, or `None` when there is
/// nothing to do: no selection, pixels already lifted, or the active layer
/// is missing, locked, or hidden.
pub fn lift(state: &CanvasState) -> Option<(Vec<LayerNode>, Selection)> {
    let sel = state.selection.as_ref()?;
    if sel.floating.is_some() {
        return None;
    }
    let layer = state.active_layer()?;
    if layer.locked || !layer.visible {
        return None;
    }

    let mut remaining = layer.pixels.clone();
    let mut floating = PixelStore::new();
    for (key, color) in layer.pixels.iter() {
        if sel.contains(key.0 as i32, key.1 as i32) {
            remaining.remove(key);
            floating.set(key, color);
        }
    }

    let tree = layers::replace_pixels(
        &state.current_frame().layers,
        state.active_layer_id,
        remaining,
    );
    let mut sel = sel.clone();
    sel.floating = Some(floating);
    Some((tree, sel))
}

/// Commit a finished move drag: floating keys are rewritten by the final
/// offset, the rectangle origin is translated to match, and the live
/// offset resets. Pixels pushed outside the canvas are dropped.
pub fn commit_move(sel: &Selection, width: u32, height: u32) -> Selection {
    let (dx, dy) = sel.drag;
    let mut out = sel.clone();
    out.x += dx;
    out.y += dy;
    out.drag = (0, 0);

    if let Some(floating) = &sel.floating {
        let mut moved = PixelStore::new();
        for ((x, y), color) in floating.iter() {
            let nx = x as i64 + dx as i64;
            let ny = y as i64 + dy as i64;
            if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                moved.set((nx as u32, ny as u32), color);
            }
        }
        out.floating = Some(moved);
    }
    out
}

/// Merge floating pixels back into the active layer on deselect.
///
/// Returns the new layer tree, or `None` when there is no floating buffer
/// (deselect then only clears the rectangle). Floating pixels win on key
/// collision.
pub fn merge_back(state: &CanvasState) -> Option<Vec<LayerNode>> {
    let sel = state.selection.as_ref()?;
    let floating = sel.floating.as_ref()?;
    let layer = state.active_layer()?;
    let merged = layer.pixels.merged(floating);
    Some(layers::replace_pixels(
        &state.current_frame().layers,
        state.active_layer_id,
        merged,
    ))
}

/// Flip or rotate the selection contents in the rectangle's local frame.
///
/// Operates on the floating buffer, lifting first when none exists.
/// Returns the updated tree and selection, or `None` when there is no
/// selection or no pixels to transform.
pub fn transform(
    state: &CanvasState,
    op: SelectionTransform,
) -> Option<(Vec<LayerNode>, Selection)> {
    state.selection.as_ref()?;

    // Lift on first touch; afterwards reuse the existing buffer
    let (tree, sel) = match lift(state) {
        Some(lifted) => lifted,
        None => (
            state.current_frame().layers.clone(),
            state.selection.clone()?,
        ),
    };

    let floating = sel.floating.as_ref()?;
    if floating.is_empty() {
        return None;
    }

    let (w, h) = (sel.w as i64, sel.h as i64);
    let (sx, sy) = (sel.x as i64, sel.y as i64);
    let mut remapped = PixelStore::new();
    for ((x, y), color) in floating.iter() {
        let rx = x as i64 - sx;
        let ry = y as i64 - sy;
        let (nx, ny) = match op {
            SelectionTransform::FlipH => (sx + (w - 1 - rx), sy + ry),
            SelectionTransform::FlipV => (sx + rx, sy + (h - 1 - ry)),
            SelectionTransform::Rotate90 => (sx + (h - 1 - ry), sy + rx),
        };
        if nx >= 0 && ny >= 0 {
            remapped.set((nx as u32, ny as u32), color);
        }
    }

    let mut sel = sel.clone();
    sel.floating = Some(remapped);
    if op == SelectionTransform::Rotate90 {
        std::mem::swap(&mut sel.w, &mut sel.h);
    }
    Some((tree, sel))
}

/// Intersect a filter's full-layer output with the selection rectangle:
/// inside the rectangle the filtered pixels fully replace the old ones
/// (including deletions); outside it the original pixels survive.
pub fn apply_within_selection(
    original: &PixelStore,
    filtered: &PixelStore,
    sel: &Selection,
) -> PixelStore {
    let mut out = original.clone();
    for (key, _) in original.iter() {
        if sel.contains(key.0 as i32, key.1 as i32) {
            out.remove(key);
        }
    }
    for (key, color) in filtered.iter() {
        if sel.contains(key.0 as i32, key.1 as i32) {
            out.set(key, color);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
