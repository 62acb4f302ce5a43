//! Shader module - WGSL sources for the built-in pipelines
//!
//! Shaders are stored as external .wgsl files and included at compile time.
//! This enables better IDE support (syntax highlighting, validation) while
//! keeping the binary self-contained. Files are fragments joined with
//! `#include "file.wgsl"` directives, so they are not valid WGSL until
//! expanded by [`crate::include`].
//!
//! ## Postprocess shaders
//!
//! User postprocess shaders are plain WGSL fragment modules, compiled
//! as-is against [`FULL_SCREEN_VERTEX`]. Each one sees the previous stage's
//! output and writes the next:
//!
//! ```wgsl
//! @group(0) @binding(0) var frame: texture_2d<f32>;
//! @group(0) @binding(1) var frame_sampler: sampler;
//!
//! @fragment
//! fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
//!     return textureSample(frame, frame_sampler, uv);
//! }
//! ```

use std::sync::OnceLock;

use crate::include::EmbeddedLoader;

pub const FULL_SCREEN_VERTEX: &str = "full_screen.wgsl";
pub const CELL_TEXT_VERTEX: &str = "cell_text.v.wgsl";
pub const CELL_TEXT_FRAGMENT: &str = "cell_text.f.wgsl";
pub const CELL_BG_FRAGMENT: &str = "cell_bg.f.wgsl";
pub const IMAGE_VERTEX: &str = "image.v.wgsl";
pub const IMAGE_FRAGMENT: &str = "image.f.wgsl";

/// Every embedded shader file keyed by its path relative to this directory
pub const FILES: &[(&str, &str)] = &[
    ("common.wgsl", include_str!("common.wgsl")),
    ("quad.wgsl", include_str!("quad.wgsl")),
    ("full_screen.wgsl", include_str!("full_screen.wgsl")),
    ("cell_text_io.wgsl", include_str!("cell_text_io.wgsl")),
    ("cell_text.v.wgsl", include_str!("cell_text.v.wgsl")),
    ("cell_text.f.wgsl", include_str!("cell_text.f.wgsl")),
    ("cell_bg.f.wgsl", include_str!("cell_bg.f.wgsl")),
    ("image_io.wgsl", include_str!("image_io.wgsl")),
    ("image.v.wgsl", include_str!("image.v.wgsl")),
    ("image.f.wgsl", include_str!("image.f.wgsl")),
];

/// Loader over [`FILES`]
pub fn embedded() -> &'static EmbeddedLoader {
    static LOADER: OnceLock<EmbeddedLoader> = OnceLock::new();
    LOADER.get_or_init(|| EmbeddedLoader::new(FILES))
}
