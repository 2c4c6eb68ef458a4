// ============================================================================
// Filters — per-layer color kernels
// ============================================================================

use rayon::prelude::*;

use crate::canvas::{CanvasState, LayerNode, PixelStore, Rgb};
use crate::components::layers;
use crate::ops::selection::apply_within_selection;

/// A filter operation over one layer's pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    /// Combined slider adjustment. All three default to 0 (no change);
    /// brightness is an additive offset, contrast/saturation are
    /// percent-style amounts in `[-100, 100]`.
    Adjust {
        brightness: i32,
        contrast: i32,
        saturation: i32,
    },
    Invert,
    Grayscale,
    Sepia,
    /// 3×3 box blur over existing pixels. Cells adjacent to colored ones
    /// receive the neighborhood average too, so the region grows by one.
    Blur,
    /// Checkerboard dither: deletes every cell where `(x + y)` is odd.
    Dither,
    /// Writes black into every empty in-bounds 4-neighbor of a colored cell.
    Outline,
}

fn clamp_channel(v: f32) -> u8 {
    v.floor().clamp(0.0, 255.0) as u8
}

/// Apply `filter` to a pixel store, producing a new store.
pub fn apply(pixels: &PixelStore, filter: &Filter, width: u32, height: u32) -> PixelStore {
    match *filter {
        Filter::Adjust {
            brightness,
            contrast,
            saturation,
        } => map_pixels(pixels, |c| adjust_color(c, brightness, contrast, saturation)),
        Filter::Invert => map_pixels(pixels, |c| Rgb::new(255 - c.r, 255 - c.g, 255 - c.b)),
        Filter::Grayscale => map_pixels(pixels, |c| {
            let avg = clamp_channel((c.r as f32 + c.g as f32 + c.b as f32) / 3.0);
            Rgb::new(avg, avg, avg)
        }),
        Filter::Sepia => map_pixels(pixels, |c| {
            // Channels are updated in sequence, each reading the values
            // already written — matching the established output
            let mut r = c.r as f32;
            let mut g = c.g as f32;
            let mut b = c.b as f32;
            r = 0.393 * r + 0.769 * g + 0.189 * b;
            g = 0.349 * r + 0.686 * g + 0.168 * b;
            b = 0.272 * r + 0.534 * g + 0.131 * b;
            Rgb::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
        }),
        Filter::Blur => box_blur(pixels, width, height),
        Filter::Dither => pixels
            .iter()
            .filter(|((x, y), _)| (x + y) % 2 == 0)
            .collect(),
        Filter::Outline => outline(pixels, width, height),
    }
}

/// Apply `filter` to the active layer, intersecting the result with the
/// active selection when one exists. Returns the new layer tree, or
/// `None` when the active layer is missing, locked, or hidden.
pub fn apply_to_active_layer(state: &CanvasState, filter: &Filter) -> Option<Vec<LayerNode>> {
    let layer = state.active_layer()?;
    if layer.locked || !layer.visible {
        return None;
    }

    let filtered = apply(&layer.pixels, filter, state.width, state.height);
    let result = match &state.selection {
        Some(sel) => apply_within_selection(&layer.pixels, &filtered, sel),
        None => filtered,
    };

    Some(layers::replace_pixels(
        &state.current_frame().layers,
        state.active_layer_id,
        result,
    ))
}

fn map_pixels(pixels: &PixelStore, f: impl Fn(Rgb) -> Rgb + Sync) -> PixelStore {
    let entries: Vec<_> = pixels.iter().collect();
    entries
        .par_iter()
        .map(|&(key, color)| (key, f(color)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

fn adjust_color(c: Rgb, brightness: i32, contrast: i32, saturation: i32) -> Rgb {
    let mut r = c.r as f32 + brightness as f32;
    let mut g = c.g as f32 + brightness as f32;
    let mut b = c.b as f32 + brightness as f32;

    if contrast != 0 {
        let cv = contrast as f32;
        let factor = (259.0 * (cv + 255.0)) / (255.0 * (259.0 - cv));
        r = factor * (r - 128.0) + 128.0;
        g = factor * (g - 128.0) + 128.0;
        b = factor * (b - 128.0) + 128.0;
    }

    if saturation != 0 {
        let s = saturation as f32 / 100.0;
        let gray = 0.2989 * r + 0.5870 * g + 0.1140 * b;
        r = gray * (1.0 - s) + r * s;
        g = gray * (1.0 - s) + g * s;
        b = gray * (1.0 - s) + b * s;
    }

    Rgb::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
}

fn box_blur(pixels: &PixelStore, width: u32, height: u32) -> PixelStore {
    let rows: Vec<PixelStore> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = PixelStore::new();
            for x in 0..width {
                let mut sum = (0u32, 0u32, 0u32);
                let mut count = 0u32;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        if let Some(c) = pixels.get((nx as u32, ny as u32)) {
                            sum.0 += c.r as u32;
                            sum.1 += c.g as u32;
                            sum.2 += c.b as u32;
                            count += 1;
                        }
                    }
                }
                if count > 0 {
                    row.set(
                        (x, y),
                        Rgb::new(
                            (sum.0 / count) as u8,
                            (sum.1 / count) as u8,
                            (sum.2 / count) as u8,
                        ),
                    );
                }
            }
            row
        })
        .collect();

    let mut out = PixelStore::new();
    for row in rows {
        for (key, color) in row.iter() {
            out.set(key, color);
        }
    }
    out
}

fn outline(pixels: &PixelStore, width: u32, height: u32) -> PixelStore {
    let mut out = pixels.clone();
    for ((x, y), _) in pixels.iter() {
        for (ox, oy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
            let nx = x as i64 + ox;
            let ny = y as i64 + oy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let key = (nx as u32, ny as u32);
            if !pixels.contains(key) {
                out.set(key, Rgb::BLACK);
            }
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Selection;

    fn store(entries: &[((u32, u32), Rgb)]) -> PixelStore {
        entries.iter().copied().collect()
    }

    #[test]
    fn invert_flips_every_channel() {
        let out = apply(
            &store(&[((0, 0), Rgb::new(255, 10, 0))]),
            &Filter::Invert,
            4,
            4,
        );
        assert_eq!(out.get((0, 0)), Some(Rgb::new(0, 245, 255)));
    }

    #[test]
    fn grayscale_averages_channels() {
        let out = apply(
            &store(&[((0, 0), Rgb::new(30, 60, 90))]),
            &Filter::Grayscale,
            4,
            4,
        );
        assert_eq!(out.get((0, 0)), Some(Rgb::new(60, 60, 60)));
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let out = apply(
            &store(&[((0, 0), Rgb::new(250, 100, 0))]),
            &Filter::Adjust {
                brightness: 20,
                contrast: 0,
                saturation: 0,
            },
            4,
            4,
        );
        assert_eq!(out.get((0, 0)), Some(Rgb::new(255, 120, 20)));
    }

    #[test]
    fn contrast_pushes_away_from_midpoint() {
        let out = apply(
            &store(&[((0, 0), Rgb::new(200, 50, 128))]),
            &Filter::Adjust {
                brightness: 0,
                contrast: 50,
                saturation: 0,
            },
            4,
            4,
        );
        let c = out.get((0, 0)).unwrap();
        assert!(c.r > 200);
        assert!(c.g < 50);
        assert_eq!(c.b, 128);
    }

    #[test]
    fn zero_adjust_is_near_identity() {
        // Brightness 0 / contrast 0 / saturation 0 only floors channels
        let input = store(&[((0, 0), Rgb::new(12, 34, 56))]);
        let out = apply(
            &input,
            &Filter::Adjust {
                brightness: 0,
                contrast: 0,
                saturation: 0,
            },
            4,
            4,
        );
        assert_eq!(out, input);
    }

    #[test]
    fn dither_deletes_odd_checker_cells() {
        let input = store(&[
            ((0, 0), Rgb::BLACK),
            ((1, 0), Rgb::BLACK),
            ((0, 1), Rgb::BLACK),
            ((1, 1), Rgb::BLACK),
        ]);
        let out = apply(&input, &Filter::Dither, 4, 4);
        assert!(out.contains((0, 0)));
        assert!(out.contains((1, 1)));
        assert!(!out.contains((1, 0)));
        assert!(!out.contains((0, 1)));
    }

    #[test]
    fn outline_writes_black_into_empty_neighbors() {
        let red = Rgb::new(255, 0, 0);
        let out = apply(&store(&[((1, 1), red)]), &Filter::Outline, 4, 4);
        assert_eq!(out.get((1, 1)), Some(red));
        for key in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            assert_eq!(out.get(key), Some(Rgb::BLACK));
        }
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn outline_respects_canvas_bounds() {
        let out = apply(&store(&[((0, 0), Rgb::BLACK)]), &Filter::Outline, 4, 4);
        // Only the two in-bounds neighbors gain outline pixels
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn blur_averages_and_grows_by_one_cell() {
        let gray = Rgb::new(90, 90, 90);
        let out = apply(&store(&[((1, 1), gray)]), &Filter::Blur, 4, 4);
        // The colored cell keeps its average (only itself in range)
        assert_eq!(out.get((1, 1)), Some(gray));
        // Adjacent empty cells receive the neighborhood average too
        assert_eq!(out.get((0, 0)), Some(gray));
        assert_eq!(out.get((2, 2)), Some(gray));
        // Cells with no colored neighbor stay empty
        assert_eq!(out.get((3, 3)), None);
    }

    #[test]
    fn filter_with_selection_only_touches_the_rect() {
        let mut state = CanvasState::new(8, 8);
        let id = state.active_layer_id;
        let pixels = store(&[((1, 1), Rgb::new(10, 10, 10)), ((5, 5), Rgb::new(10, 10, 10))]);
        state.current_frame_mut().layers =
            layers::replace_pixels(&state.current_frame().layers, id, pixels);
        state.selection = Some(Selection::from_corners(0, 0, 2, 2));

        let tree = apply_to_active_layer(&state, &Filter::Invert).unwrap();
        let layer = layers::find(&tree, id).and_then(|n| n.as_layer()).unwrap();
        assert_eq!(layer.pixels.get((1, 1)), Some(Rgb::new(245, 245, 245)));
        assert_eq!(layer.pixels.get((5, 5)), Some(Rgb::new(10, 10, 10)));
    }

    #[test]
    fn locked_layer_rejects_filters() {
        let mut state = CanvasState::new(8, 8);
        let id = state.active_layer_id;
        state.current_frame_mut().layers =
            layers::update_by_id(&state.current_frame().layers, id, &|node| {
                if let LayerNode::Layer(l) = node {
                    l.locked = true;
                }
            });
        assert!(apply_to_active_layer(&state, &Filter::Invert).is_none());
    }
}
