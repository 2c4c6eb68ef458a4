// ============================================================================
// Compositor — tree flattening and raster rendering
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use uuid::Uuid;

use crate::canvas::{BlendMode, LayerNode, PixelStore, Rgb, ONION_SKIN_OPACITY};

/// A leaf layer with its opacity and visibility resolved through every
/// enclosing group. Groups never appear in a flattened sequence.
pub struct FlatLayer<'a> {
    pub id: Uuid,
    pub pixels: &'a PixelStore,
    pub opacity: f32,
    pub visible: bool,
    pub blend_mode: BlendMode,
}

/// Flatten a layer tree in pre-order.
///
/// Opacity multiplies down the hierarchy and visibility ANDs, so each
/// returned leaf carries its fully effective values. The first element is
/// the topmost layer; the render step iterates the sequence in reverse so
/// that "top of list" paints on top.
pub fn flatten(tree: &[LayerNode]) -> Vec<FlatLayer<'_>> {
    let mut out = Vec::new();
    flatten_into(tree, 1.0, true, &mut out);
    out
}

fn flatten_into<'a>(
    nodes: &'a [LayerNode],
    parent_opacity: f32,
    parent_visible: bool,
    out: &mut Vec<FlatLayer<'a>>,
) {
    for node in nodes {
        match node {
            LayerNode::Layer(l) => out.push(FlatLayer {
                id: l.id,
                pixels: &l.pixels,
                opacity: l.opacity * parent_opacity,
                visible: l.visible && parent_visible,
                blend_mode: l.blend_mode,
            }),
            LayerNode::Group(g) => flatten_into(
                &g.children,
                g.opacity * parent_opacity,
                g.visible && parent_visible,
                out,
            ),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Decoration applied on top of the plain frame render.
#[derive(Default)]
pub struct RenderOptions<'a> {
    /// Previous frame's layer tree, ghosted beneath the current frame.
    pub onion_previous: Option<&'a [LayerNode]>,
    /// Ghost alpha; `None` uses [`ONION_SKIN_OPACITY`].
    pub onion_opacity: Option<f32>,
    /// Repeat the canvas on a 3×3 grid for seamless-tile preview.
    pub tile_preview: bool,
    /// Floating selection pixels painted topmost, pre-offset by the live
    /// drag delta.
    pub floating: Option<(&'a PixelStore, (i32, i32))>,
}

/// Render a frame's layer tree with optional decoration.
///
/// The plain output is `width × height`; with `tile_preview` the result
/// is `3w × 3h` with the canonical tile at the center.
pub fn render(width: u32, height: u32, tree: &[LayerNode], opts: &RenderOptions) -> RgbaImage {
    let flat = flatten(tree);
    let onion_flat = opts.onion_previous.map(flatten);
    let ghost_alpha = opts.onion_opacity.unwrap_or(ONION_SKIN_OPACITY);

    let mut buf = vec![0u8; (width * height * 4) as usize];
    let row_bytes = (width * 4) as usize;
    buf.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        // Ghost of the previous frame first, beneath everything
        if let Some(onion) = &onion_flat {
            for fl in onion.iter().rev() {
                if !fl.visible {
                    continue;
                }
                blend_row(row, y, width, fl.pixels, ghost_alpha, BlendMode::Normal);
            }
        }
        // Current frame, back-to-front (reverse of tree order)
        for fl in flat.iter().rev() {
            if !fl.visible {
                continue;
            }
            blend_row(row, y, width, fl.pixels, fl.opacity, fl.blend_mode);
        }
    });

    // Floating selection preview, topmost, at full opacity
    if let Some((floating, (dx, dy))) = opts.floating {
        for ((x, y), color) in floating.iter() {
            let fx = x as i64 + dx as i64;
            let fy = y as i64 + dy as i64;
            if fx >= 0 && fy >= 0 && fx < width as i64 && fy < height as i64 {
                let idx = ((fy as u32 * width + fx as u32) * 4) as usize;
                buf[idx] = color.r;
                buf[idx + 1] = color.g;
                buf[idx + 2] = color.b;
                buf[idx + 3] = 255;
            }
        }
    }

    let base = RgbaImage::from_raw(width, height, buf)
        .unwrap_or_else(|| RgbaImage::new(width, height));

    if !opts.tile_preview {
        return base;
    }

    // 3×3 repetition — the tiles are exact copies, center tile canonical
    let mut tiled = RgbaImage::new(width * 3, height * 3);
    for ty in 0..3u32 {
        for tx in 0..3u32 {
            image::imageops::overlay(
                &mut tiled,
                &base,
                (tx * width) as i64,
                (ty * height) as i64,
            );
        }
    }
    tiled
}

fn blend_row(
    row: &mut [u8],
    y: u32,
    width: u32,
    pixels: &PixelStore,
    opacity: f32,
    mode: BlendMode,
) {
    for x in 0..width {
        if let Some(color) = pixels.get((x, y)) {
            let idx = (x * 4) as usize;
            let base = Rgba([row[idx], row[idx + 1], row[idx + 2], row[idx + 3]]);
            let blended = blend_pixel(base, color, mode, opacity);
            row[idx] = blended[0];
            row[idx + 1] = blended[1];
            row[idx + 2] = blended[2];
            row[idx + 3] = blended[3];
        }
    }
}

/// Render one frame with no decoration — the deterministic path export
/// collaborators consume (static images, per-frame animation rasters).
pub fn draw_frame(width: u32, height: u32, tree: &[LayerNode]) -> RgbaImage {
    render(width, height, tree, &RenderOptions::default())
}

/// Eyedropper: the composited, blend-resolved color at a coordinate.
/// Returns `None` where the render is fully transparent.
pub fn sample_color(width: u32, height: u32, tree: &[LayerNode], x: u32, y: u32) -> Option<Rgb> {
    if x >= width || y >= height {
        return None;
    }
    let img = draw_frame(width, height, tree);
    let px = img.get_pixel(x, y);
    if px[3] == 0 {
        None
    } else {
        Some(Rgb::new(px[0], px[1], px[2]))
    }
}

// ============================================================================
// Per-pixel blending
// ============================================================================

/// Blend an opaque layer color over a (possibly transparent) base pixel.
///
/// The layer's effective opacity acts as the source alpha. Blend modes
/// mix with the backdrop proportionally to the backdrop's coverage before
/// the standard source-over composite, matching 2D canvas operators.
pub fn blend_pixel(base: Rgba<u8>, top: Rgb, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    let top_a = opacity.clamp(0.0, 1.0);
    if top_a <= 0.0 {
        return base;
    }

    // Fast path: opaque Normal paint just overwrites
    if matches!(mode, BlendMode::Normal) && top_a >= 1.0 {
        return Rgba([top.r, top.g, top.b, 255]);
    }

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top.r as f32 / 255.0;
    let top_g = top.g as f32 / 255.0;
    let top_b = top.b as f32 / 255.0;

    let (blend_r, blend_g, blend_b) = match mode {
        BlendMode::Normal => (top_r, top_g, top_b),
        BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
        BlendMode::Screen => (
            1.0 - (1.0 - base_r) * (1.0 - top_r),
            1.0 - (1.0 - base_g) * (1.0 - top_g),
            1.0 - (1.0 - base_b) * (1.0 - top_b),
        ),
        BlendMode::Overlay => (
            overlay_channel(base_r, top_r),
            overlay_channel(base_g, top_g),
            overlay_channel(base_b, top_b),
        ),
        BlendMode::Darken => (base_r.min(top_r), base_g.min(top_g), base_b.min(top_b)),
        BlendMode::Lighten => (base_r.max(top_r), base_g.max(top_g), base_b.max(top_b)),
        BlendMode::Add => (
            (base_r + top_r).min(1.0),
            (base_g + top_g).min(1.0),
            (base_b + top_b).min(1.0),
        ),
        BlendMode::Difference => (
            (base_r - top_r).abs(),
            (base_g - top_g).abs(),
            (base_b - top_b).abs(),
        ),
    };

    // Where the backdrop is transparent the blend result falls back to the
    // source color (B over nothing is just B's source)
    let src_r = (1.0 - base_a) * top_r + base_a * blend_r;
    let src_g = (1.0 - base_a) * top_g + base_a * blend_g;
    let src_b = (1.0 - base_a) * top_b + base_a * blend_b;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let out_r = (src_r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (src_g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (src_b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    Rgba([
        (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

fn overlay_channel(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Group, Layer};

    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

    fn layer_with(name: &str, pixels: &[((u32, u32), Rgb)]) -> Layer {
        let mut l = Layer::new(name);
        for &(key, color) in pixels {
            l.pixels.set(key, color);
        }
        l
    }

    #[test]
    fn flatten_of_flat_tree_is_identity_shaped() {
        let tree = vec![
            LayerNode::Layer(layer_with("A", &[])),
            LayerNode::Layer(layer_with("B", &[])),
        ];
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].id, tree[0].id());
        assert_eq!(flat[1].id, tree[1].id());
        assert!(flat.iter().all(|f| f.visible && f.opacity == 1.0));
    }

    #[test]
    fn opacity_multiplies_down_the_hierarchy() {
        let mut inner = layer_with("Inner", &[]);
        inner.opacity = 0.5;
        let mut group = Group::new("G", vec![LayerNode::Layer(inner)]);
        group.opacity = 0.4;
        let tree = [LayerNode::Group(group)];
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 1);
        assert!((flat[0].opacity - 0.2).abs() < 1e-6);
    }

    #[test]
    fn hidden_group_hides_visible_children() {
        let inner = layer_with("Inner", &[]);
        let mut group = Group::new("G", vec![LayerNode::Layer(inner)]);
        group.visible = false;
        let tree = [LayerNode::Group(group)];
        let flat = flatten(&tree);
        assert!(!flat[0].visible);
    }

    #[test]
    fn groups_never_appear_in_flat_output() {
        let tree = vec![LayerNode::Group(Group::new(
            "G",
            vec![LayerNode::Layer(layer_with("A", &[]))],
        ))];
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].id, tree[0].as_group().unwrap().children[0].id());
    }

    #[test]
    fn first_layer_in_tree_order_paints_on_top() {
        let tree = vec![
            LayerNode::Layer(layer_with("Top", &[((0, 0), RED)])),
            LayerNode::Layer(layer_with("Bottom", &[((0, 0), BLUE)])),
        ];
        let img = draw_frame(2, 2, &tree);
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn invisible_layers_are_skipped() {
        let mut top = layer_with("Top", &[((0, 0), RED)]);
        top.visible = false;
        let tree = vec![
            LayerNode::Layer(top),
            LayerNode::Layer(layer_with("Bottom", &[((0, 0), BLUE)])),
        ];
        let img = draw_frame(2, 2, &tree);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn layer_opacity_becomes_surface_alpha() {
        let mut l = layer_with("L", &[((0, 0), RED)]);
        l.opacity = 0.5;
        let img = draw_frame(1, 1, &[LayerNode::Layer(l)]);
        let px = img.get_pixel(0, 0);
        assert_eq!((px[0], px[1], px[2]), (255, 0, 0));
        assert!((127..=128).contains(&px[3]));
    }

    #[test]
    fn multiply_blend_darkens_against_the_backdrop() {
        let tree = vec![
            LayerNode::Layer({
                let mut l = layer_with("Top", &[((0, 0), Rgb::new(128, 255, 0))]);
                l.blend_mode = BlendMode::Multiply;
                l
            }),
            LayerNode::Layer(layer_with("Bottom", &[((0, 0), Rgb::new(255, 128, 255))])),
        ];
        let img = draw_frame(1, 1, &tree);
        let px = img.get_pixel(0, 0);
        // r: 0.502*1.0, g: 1.0*0.502, b: 0*1.0
        assert_eq!(px[3], 255);
        assert!((px[0] as i32 - 128).abs() <= 1);
        assert!((px[1] as i32 - 128).abs() <= 1);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn add_blend_saturates() {
        let tree = vec![
            LayerNode::Layer({
                let mut l = layer_with("Top", &[((0, 0), Rgb::new(200, 10, 0))]);
                l.blend_mode = BlendMode::Add;
                l
            }),
            LayerNode::Layer(layer_with("Bottom", &[((0, 0), Rgb::new(100, 10, 0))])),
        ];
        let img = draw_frame(1, 1, &tree);
        let px = img.get_pixel(0, 0);
        assert_eq!(px[0], 255);
        assert_eq!(px[1], 20);
    }

    #[test]
    fn onion_skin_ghosts_the_previous_frame() {
        let prev = vec![LayerNode::Layer(layer_with("Prev", &[((1, 1), BLUE)]))];
        let curr = vec![LayerNode::Layer(layer_with("Curr", &[((0, 0), RED)]))];
        let opts = RenderOptions {
            onion_previous: Some(&prev),
            ..Default::default()
        };
        let img = render(4, 4, &curr, &opts);
        // Current frame at full strength
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        // Ghost at reduced alpha
        let ghost = img.get_pixel(1, 1);
        assert_eq!((ghost[0], ghost[1], ghost[2]), (0, 0, 255));
        assert!((76..=77).contains(&ghost[3]));
    }

    #[test]
    fn tile_preview_repeats_the_canvas_nine_times() {
        let tree = vec![LayerNode::Layer(layer_with("L", &[((1, 0), RED)]))];
        let opts = RenderOptions {
            tile_preview: true,
            ..Default::default()
        };
        let img = render(4, 4, &tree, &opts);
        assert_eq!((img.width(), img.height()), (12, 12));
        for ty in 0..3u32 {
            for tx in 0..3u32 {
                assert_eq!(img.get_pixel(tx * 4 + 1, ty * 4).0, [255, 0, 0, 255]);
            }
        }
    }

    #[test]
    fn floating_pixels_render_pre_offset() {
        let tree = vec![LayerNode::Layer(layer_with("L", &[]))];
        let mut floating = PixelStore::new();
        floating.set((0, 0), RED);
        let opts = RenderOptions {
            floating: Some((&floating, (2, 1))),
            ..Default::default()
        };
        let img = render(4, 4, &tree, &opts);
        assert_eq!(img.get_pixel(2, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn sample_color_reads_the_composite() {
        let tree = vec![
            LayerNode::Layer(layer_with("Top", &[((0, 0), RED)])),
            LayerNode::Layer(layer_with("Bottom", &[((0, 0), BLUE), ((1, 0), BLUE)])),
        ];
        assert_eq!(sample_color(2, 1, &tree, 0, 0), Some(RED));
        assert_eq!(sample_color(2, 1, &tree, 1, 0), Some(BLUE));
        assert_eq!(sample_color(2, 1, &tree, 1, 5), None);
    }
}
