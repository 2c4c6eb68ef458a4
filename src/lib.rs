//! PixelFE — a pixel-art editing and compositing engine.
//!
//! The core is a set of pure operations over a sparse, layered, frame-based
//! canvas model: shape rasterization, flood fill, selection lift/move/
//! transform, layer-tree edits, blend-mode compositing, and bounded
//! snapshot history. The `pixelfe` binary renders `.pxf` project files to
//! PNG headlessly.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
