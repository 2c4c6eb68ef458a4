// ============================================================================
// Flood fill — iterative, 4-connected, selection-aware
// ============================================================================

use std::collections::HashSet;

use crate::canvas::{PixelStore, Rgb, Selection};

/// Stack-based contiguous fill from `seed`.
///
/// The fill region is every 4-connected cell whose color equals the seed
/// cell's color — including the transparent case, where both are absent.
/// Out-of-bounds cells and cells outside an active selection never join
/// the region. Returns a new store; the input is untouched.
///
/// Iterative on an explicit stack so large regions cannot overflow the
/// call stack. The result is independent of stack discovery order.
pub fn flood_fill(
    pixels: &PixelStore,
    seed: (u32, u32),
    target: Rgb,
    width: u32,
    height: u32,
    selection: Option<&Selection>,
) -> PixelStore {
    let start = pixels.get(seed);

    // Filling a region with its own color is a no-op
    if start == Some(target) {
        return pixels.clone();
    }

    let mut out = pixels.clone();
    let mut visited: HashSet<(i64, i64)> = HashSet::new();
    let mut stack: Vec<(i64, i64)> = vec![(seed.0 as i64, seed.1 as i64)];

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            continue;
        }
        if let Some(sel) = selection
            && !sel.contains(x as i32, y as i32)
        {
            continue;
        }
        if !visited.insert((x, y)) {
            continue;
        }

        let key = (x as u32, y as u32);
        if pixels.get(key) != start {
            continue;
        }

        out.set(key, target);
        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }

    out
}

// ============================================================================
// Tests
// ============================================================================
