// ============================================================================
// Core data model — colors, sparse pixel storage, layer tree, frames, state
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::colors::DEFAULT_PALETTE;

/// Default canvas size for a new project.
pub const DEFAULT_WIDTH: u32 = 32;
pub const DEFAULT_HEIGHT: u32 = 32;

/// Canvas dimensions are clamped to this range rather than rejected.
pub const MIN_DIMENSION: u32 = 4;
pub const MAX_DIMENSION: u32 = 128;

/// Default animation playback rate.
pub const DEFAULT_FPS: u32 = 8;

/// Global alpha used when ghosting the previous frame under the current one.
pub const ONION_SKIN_OPACITY: f32 = 0.3;

/// Clamp a requested canvas dimension into the supported range.
pub fn clamp_dimension(v: u32) -> u32 {
    v.clamp(MIN_DIMENSION, MAX_DIMENSION)
}

/// Toroidal coordinate wrap: any integer maps into `[0, size)`.
///
/// Strokes that run off one canvas edge continue on the opposite edge, so
/// every plotted coordinate goes through this before becoming a pixel key.
pub fn wrap_coord(v: i64, size: u32) -> u32 {
    let s = size as i64;
    (((v % s) + s) % s) as u32
}

// ============================================================================
// Color
// ============================================================================

/// A packed opaque RGB color.
///
/// Pixel data is stored as this triple; the canonical external form is a
/// lowercase `#rrggbb` string produced by [`Rgb::to_hex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse a hex color string, case-insensitive, with or without a
    /// leading `#`. Accepts 3-digit (`#abc` → `#aabbcc`) and 6-digit forms.
    pub fn parse(s: &str) -> Option<Rgb> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars();
                let r = it.next()?.to_digit(16)? as u8;
                let g = it.next()?.to_digit(16)? as u8;
                let b = it.next()?.to_digit(16)? as u8;
                Some(Rgb::new(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb::new(r, g, b))
            }
            _ => None,
        }
    }

    /// Canonical lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ============================================================================
// Pixel store
// ============================================================================

/// Coordinate key into a [`PixelStore`]. Both components are canvas-space
/// and non-negative; tool code wraps/clips before inserting.
pub type PixelKey = (u32, u32);

/// Sparse per-layer pixel storage: coordinate → color.
///
/// Absence of a key means transparent. Bounds are not enforced here — tool
/// algorithms are responsible for wrapping and clipping before writing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelStore(HashMap<PixelKey, Rgb>);

impl PixelStore {
    pub fn new() -> Self {
        PixelStore(HashMap::new())
    }

    pub fn get(&self, key: PixelKey) -> Option<Rgb> {
        self.0.get(&key).copied()
    }

    pub fn set(&mut self, key: PixelKey, color: Rgb) {
        self.0.insert(key, color);
    }

    pub fn remove(&mut self, key: PixelKey) {
        self.0.remove(&key);
    }

    pub fn contains(&self, key: PixelKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PixelKey, Rgb)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = PixelKey> + '_ {
        self.0.keys().copied()
    }

    /// Merge `overlay` into a copy of `self`; overlay wins on key collision.
    pub fn merged(&self, overlay: &PixelStore) -> PixelStore {
        let mut out = self.clone();
        for (k, v) in overlay.iter() {
            out.set(k, v);
        }
        out
    }
}

impl FromIterator<(PixelKey, Rgb)> for PixelStore {
    fn from_iter<I: IntoIterator<Item = (PixelKey, Rgb)>>(iter: I) -> Self {
        PixelStore(iter.into_iter().collect())
    }
}

// ============================================================================
// Blend modes
// ============================================================================

/// Layer blend modes, mapped 1:1 to standard 2D compositing operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Add,
    Difference,
}

impl BlendMode {
    pub fn all() -> [BlendMode; 8] {
        [
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Add,
            BlendMode::Difference,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Add => "Add",
            BlendMode::Difference => "Difference",
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            BlendMode::Normal => 0,
            BlendMode::Multiply => 1,
            BlendMode::Screen => 2,
            BlendMode::Overlay => 3,
            BlendMode::Darken => 4,
            BlendMode::Lighten => 5,
            BlendMode::Add => 6,
            BlendMode::Difference => 7,
        }
    }

    /// Unknown values fall back to Normal.
    pub fn from_u8(v: u8) -> BlendMode {
        match v {
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            4 => BlendMode::Darken,
            5 => BlendMode::Lighten,
            6 => BlendMode::Add,
            7 => BlendMode::Difference,
            _ => BlendMode::Normal,
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Normal
    }
}

// ============================================================================
// Layer tree
// ============================================================================

/// A paintable leaf layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub blend_mode: BlendMode,
    pub opacity: f32,
    pub pixels: PixelStore,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Layer {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            pixels: PixelStore::new(),
        }
    }
}

/// A group node. Groups carry no pixels of their own; their effective
/// content is the union of their descendants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub blend_mode: BlendMode,
    pub opacity: f32,
    pub expanded: bool,
    pub children: Vec<LayerNode>,
}

impl Group {
    pub fn new(name: impl Into<String>, children: Vec<LayerNode>) -> Self {
        Group {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            expanded: true,
            children,
        }
    }
}

/// One node of the layer tree. Ids are unique across the whole tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LayerNode {
    Layer(Layer),
    Group(Group),
}

impl LayerNode {
    pub fn id(&self) -> Uuid {
        match self {
            LayerNode::Layer(l) => l.id,
            LayerNode::Group(g) => g.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LayerNode::Layer(l) => &l.name,
            LayerNode::Group(g) => &g.name,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            LayerNode::Layer(l) => l.visible,
            LayerNode::Group(g) => g.visible,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            LayerNode::Layer(l) => l.opacity,
            LayerNode::Group(g) => g.opacity,
        }
    }

    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            LayerNode::Layer(l) => Some(l),
            LayerNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            LayerNode::Group(g) => Some(g),
            LayerNode::Layer(_) => None,
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

/// One animation tick: a full independent layer tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub layers: Vec<LayerNode>,
}

impl Frame {
    /// A frame containing a single default layer.
    pub fn new() -> Self {
        Frame {
            id: Uuid::new_v4(),
            layers: vec![LayerNode::Layer(Layer::new("Layer 1"))],
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

// ============================================================================
// Selection
// ============================================================================

/// An active rectangular selection, possibly carrying lifted pixels.
///
/// `floating` holds pixels cut out of the active layer during a move or
/// transform; `drag` is the live, uncommitted move offset. Lifecycle logic
/// lives in `ops::selection`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub floating: Option<PixelStore>,
    pub drag: (i32, i32),
}

impl Selection {
    /// Normalize two drag corners into a selection rectangle.
    /// `w`/`h` are inclusive of both endpoints.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Selection {
            x: x0.min(x1),
            y: y0.min(y1),
            w: x0.abs_diff(x1) + 1,
            h: y0.abs_diff(y1) + 1,
            floating: None,
            drag: (0, 0),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && (x - self.x) < self.w as i32
            && (y - self.y) < self.h as i32
    }
}

// ============================================================================
// Canvas state
// ============================================================================

/// Full editing state for one open project: frame set, active layer,
/// palette, selection, and tool flags. Mutating operations clone the tree
/// they change, so history snapshots stay structurally independent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Frame>,
    pub current_frame_index: usize,
    pub active_layer_id: Uuid,
    pub palette: Vec<String>,
    pub selection: Option<Selection>,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub tile_mode: bool,
    pub brush_size: u32,
    pub fps: u32,
}

impl CanvasState {
    /// A fresh single-frame project. Dimensions outside the supported
    /// range are clamped, not rejected.
    pub fn new(width: u32, height: u32) -> Self {
        let frame = Frame::new();
        let active_layer_id = frame.layers[0].id();
        CanvasState {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
            frames: vec![frame],
            current_frame_index: 0,
            active_layer_id,
            palette: DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
            selection: None,
            mirror_x: false,
            mirror_y: false,
            tile_mode: false,
            brush_size: 1,
            fps: DEFAULT_FPS,
        }
    }

    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.current_frame_index]
    }

    pub fn current_frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.current_frame_index]
    }

    /// The active layer in the current frame, if its id still resolves.
    pub fn active_layer(&self) -> Option<&Layer> {
        crate::components::layers::find(&self.current_frame().layers, self.active_layer_id)
            .and_then(|node| node.as_layer())
    }

    /// Append an empty frame (one default layer) and switch to it.
    pub fn add_frame(&mut self) {
        let frame = Frame::new();
        self.active_layer_id = frame.layers[0].id();
        self.frames.push(frame);
        self.current_frame_index = self.frames.len() - 1;
    }

    /// Insert a deep copy of the current frame after it, with fresh ids
    /// throughout, and switch to the copy.
    pub fn duplicate_frame(&mut self) {
        let copy = Frame {
            id: Uuid::new_v4(),
            layers: self
                .current_frame()
                .layers
                .iter()
                .cloned()
                .map(crate::components::layers::regenerate_ids)
                .collect(),
        };
        self.active_layer_id = crate::components::layers::first_leaf_id(&copy.layers)
            .unwrap_or_else(|| copy.layers[0].id());
        self.frames.insert(self.current_frame_index + 1, copy);
        self.current_frame_index += 1;
    }

    /// Delete the current frame. Refused when it is the last one — a
    /// project always keeps at least one frame.
    pub fn delete_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        self.frames.remove(self.current_frame_index);
        if self.current_frame_index >= self.frames.len() {
            self.current_frame_index = self.frames.len() - 1;
        }
        let layers = &self.current_frame().layers;
        self.active_layer_id = crate::components::layers::first_leaf_id(layers)
            .unwrap_or_else(|| layers[0].id());
    }
}

// ============================================================================
// Tests
// ============================================================================
