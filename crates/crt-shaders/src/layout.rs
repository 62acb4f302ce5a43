//! GPU record layouts shared by the host and the built-in shaders
//!
//! Every type here is `#[repr(C)]` + `Pod` and mirrors a struct in
//! `shaders/common.wgsl` (uniforms) or a vertex input of a built-in
//! pipeline (instance records). Field order, sizes and explicit padding are
//! part of the contract with the shaders; the tests at the bottom pin them.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Render mode of a [`CellText`] instance
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellTextMode {
    /// Plain foreground glyph
    #[default]
    Fg = 1,
    /// Foreground glyph scaled down to fit `constraint_width` cells
    FgConstrained = 2,
    /// Pre-colored glyph (emoji), color comes from the atlas
    FgColor = 3,
    /// Cursor glyph
    Cursor = 4,
    /// Powerline glyph, exempt from minimum contrast
    FgPowerline = 5,
}

impl CellTextMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Fg),
            2 => Some(Self::FgConstrained),
            3 => Some(Self::FgColor),
            4 => Some(Self::Cursor),
            5 => Some(Self::FgPowerline),
            _ => None,
        }
    }
}

/// Per-instance record for one foreground glyph (32 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CellText {
    /// Top-left of the glyph in the atlas, in texels
    pub glyph_pos: [u32; 2],
    /// Glyph size in texels
    pub glyph_size: [u32; 2],
    /// Bearing offsets from the cell origin, in pixels
    pub bearings: [i16; 2],
    /// Column and row of the cell
    pub grid_pos: [u16; 2],
    /// RGBA foreground color
    pub color: [u8; 4],
    mode: u8,
    /// Width in cells a constrained glyph must fit in, 0 if unconstrained
    pub constraint_width: u8,
    _reserved: [u8; 2],
}

impl CellText {
    pub const ATTRIBS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Uint32x2,  // glyph_pos
        1 => Uint32x2,  // glyph_size
        2 => Sint16x2,  // bearings
        3 => Uint16x2,  // grid_pos
        4 => Uint8x4,   // color
        5 => Uint8x2,   // mode, constraint_width
    ];

    pub fn new(mode: CellTextMode, grid_pos: [u16; 2], color: [u8; 4]) -> Self {
        Self {
            grid_pos,
            color,
            mode: mode as u8,
            ..Self::default()
        }
    }

    /// Decoded render mode; `None` for a zeroed or corrupt record
    pub fn mode(&self) -> Option<CellTextMode> {
        CellTextMode::from_u8(self.mode)
    }

    pub fn set_mode(&mut self, mode: CellTextMode) {
        self.mode = mode as u8;
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<CellText>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Background color of one grid cell, indexed by `row * columns + column`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CellBg(pub [u8; 4]);

/// Per-instance record for one image placement (48 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Image {
    /// Grid cell the image is anchored to
    pub grid_pos: [f32; 2],
    /// Pixel offset inside the anchor cell
    pub cell_offset: [f32; 2],
    /// Normalized source rectangle: x, y, width, height
    pub source_rect: [f32; 4],
    /// Destination size in pixels
    pub dest_size: [f32; 2],
    _pad: [f32; 2],
}

impl Image {
    pub const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,  // grid_pos
        1 => Float32x2,  // cell_offset
        2 => Float32x4,  // source_rect
        3 => Float32x2,  // dest_size
    ];

    pub fn new(
        grid_pos: [f32; 2],
        cell_offset: [f32; 2],
        source_rect: [f32; 4],
        dest_size: [f32; 2],
    ) -> Self {
        Self {
            grid_pos,
            cell_offset,
            source_rect,
            dest_size,
            _pad: [0.0; 2],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Image>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Padding edges that take the color of the adjacent cell's background
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PaddingExtend(u32);

impl PaddingExtend {
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const UP: Self = Self(1 << 2);
    pub const DOWN: Self = Self(1 << 3);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    /// Decode raw bits, rejecting anything with reserved bits set
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    pub fn left(self) -> bool {
        self.contains(Self::LEFT)
    }

    pub fn right(self) -> bool {
        self.contains(Self::RIGHT)
    }

    pub fn up(self) -> bool {
        self.contains(Self::UP)
    }

    pub fn down(self) -> bool {
        self.contains(Self::DOWN)
    }
}

impl std::ops::BitOr for PaddingExtend {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-frame boolean switches packed into one `u32`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct FrameFlags(u32);

impl FrameFlags {
    /// The cursor covers two cells
    pub const CURSOR_WIDE: Self = Self(1 << 0);
    /// Colors are already in Display P3
    pub const DISPLAY_P3: Self = Self(1 << 1);
    /// The attachment is sRGB-typed, so shaders must output linear color
    pub const LINEAR_BLENDING: Self = Self(1 << 2);
    /// Correct text weight when blending in linear space
    pub const LINEAR_CORRECTION: Self = Self(1 << 3);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    /// Decode raw bits, rejecting anything with reserved bits set
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    pub fn cursor_wide(self) -> bool {
        self.contains(Self::CURSOR_WIDE)
    }

    pub fn display_p3(self) -> bool {
        self.contains(Self::DISPLAY_P3)
    }

    pub fn linear_blending(self) -> bool {
        self.contains(Self::LINEAR_BLENDING)
    }

    pub fn linear_correction(self) -> bool {
        self.contains(Self::LINEAR_CORRECTION)
    }
}

impl std::ops::BitOr for FrameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-frame uniforms shared by every built-in pipeline (128 bytes)
///
/// Must match `Uniforms` in `shaders/common.wgsl` exactly. WGSL has no
/// 16-bit integers, so the `[u16; 2]` pairs are read there as one packed
/// `u32` (low half first) and the `[u8; 4]` colors as one packed `u32`.
/// Aligned to 16 like the WGSL struct, whose first member is a `mat4x4<f32>`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub projection_matrix: [[f32; 4]; 4],
    /// Cell size in pixels
    pub cell_size: [f32; 2],
    /// Columns, rows
    pub grid_size: [u16; 2],
    _pad0: [u32; 1],
    /// Top, right, bottom, left, in pixels
    pub grid_padding: [f32; 4],
    pub padding_extend: PaddingExtend,
    /// Minimum WCAG contrast ratio between text and its background
    pub min_contrast: f32,
    /// Cursor column, row
    pub cursor_pos: [u16; 2],
    pub cursor_color: [u8; 4],
    pub bg_color: [u8; 4],
    pub flags: FrameFlags,
    _pad1: [u32; 2],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            projection_matrix: IDENTITY,
            cell_size: [0.0; 2],
            grid_size: [0; 2],
            _pad0: [0],
            grid_padding: [0.0; 4],
            padding_extend: PaddingExtend::NONE,
            min_contrast: 1.0,
            cursor_pos: [0; 2],
            cursor_color: [0; 4],
            bg_color: [0; 4],
            flags: FrameFlags::NONE,
            _pad1: [0; 2],
        }
    }
}

impl Uniforms {
    /// Uniforms for a `width` x `height` pixel surface
    pub fn new(width: f32, height: f32, cell_size: [f32; 2], grid_size: [u16; 2]) -> Self {
        Self {
            projection_matrix: ortho2d(0.0, width, height, 0.0),
            cell_size,
            grid_size,
            ..Self::default()
        }
    }

    /// Decode uniforms from raw bytes, e.g. when reading back a buffer.
    ///
    /// Returns `None` if the slice has the wrong length or either flag field
    /// has a reserved bit set.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let uniforms: Self = bytemuck::try_pod_read_unaligned(bytes).ok()?;
        PaddingExtend::from_bits(uniforms.padding_extend.bits())?;
        FrameFlags::from_bits(uniforms.flags.bits())?;
        Some(uniforms)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Column-major orthographic projection mapping the given pixel rectangle
/// onto clip space, with depth fixed at zero.
pub fn ortho2d(left: f32, right: f32, bottom: f32, top: f32) -> [[f32; 4]; 4] {
    let w = right - left;
    let h = top - bottom;
    [
        [2.0 / w, 0.0, 0.0, 0.0],
        [0.0, 2.0 / h, 0.0, 0.0],
        [0.0, 0.0, -1.0, 0.0],
        [-(right + left) / w, -(top + bottom) / h, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of};

    #[test]
    fn test_cell_text_is_32_bytes() {
        assert_eq!(size_of::<CellText>(), 32);
        assert_eq!(offset_of!(CellText, glyph_pos), 0);
        assert_eq!(offset_of!(CellText, glyph_size), 8);
        assert_eq!(offset_of!(CellText, bearings), 16);
        assert_eq!(offset_of!(CellText, grid_pos), 20);
        assert_eq!(offset_of!(CellText, color), 24);
        assert_eq!(offset_of!(CellText, mode), 28);
        assert_eq!(offset_of!(CellText, constraint_width), 29);
    }

    #[test]
    fn test_cell_text_attributes_match_offsets() {
        let offsets: Vec<u64> = CellText::ATTRIBS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 20, 24, 28]);
        let desc = CellText::desc();
        assert_eq!(desc.array_stride, 32);
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn test_cell_text_mode_roundtrip() {
        let mut cell = CellText::new(CellTextMode::Cursor, [3, 4], [255, 0, 0, 255]);
        assert_eq!(cell.mode(), Some(CellTextMode::Cursor));
        assert_eq!(cell.constraint_width, 0);
        cell.set_mode(CellTextMode::FgPowerline);
        assert_eq!(bytemuck::bytes_of(&cell)[28], 5);
        assert_eq!(CellText::zeroed().mode(), None);
    }

    #[test]
    fn test_cell_bg_is_four_bytes() {
        assert_eq!(size_of::<CellBg>(), 4);
        let cells = [CellBg([1, 2, 3, 4]), CellBg([5, 6, 7, 8])];
        assert_eq!(bytemuck::cast_slice::<CellBg, u8>(&cells), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_image_layout() {
        assert_eq!(size_of::<Image>(), 48);
        assert_eq!(offset_of!(Image, grid_pos), 0);
        assert_eq!(offset_of!(Image, cell_offset), 8);
        assert_eq!(offset_of!(Image, source_rect), 16);
        assert_eq!(offset_of!(Image, dest_size), 32);
        assert_eq!(size_of::<Image>() % 16, 0);
        let offsets: Vec<u64> = Image::ATTRIBS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 32]);
    }

    #[test]
    fn test_uniforms_layout() {
        assert_eq!(size_of::<Uniforms>(), 128);
        assert_eq!(align_of::<Uniforms>(), 16);
        assert_eq!(offset_of!(Uniforms, projection_matrix), 0);
        assert_eq!(offset_of!(Uniforms, cell_size), 64);
        assert_eq!(offset_of!(Uniforms, grid_size), 72);
        assert_eq!(offset_of!(Uniforms, grid_padding), 80);
        assert_eq!(offset_of!(Uniforms, padding_extend), 96);
        assert_eq!(offset_of!(Uniforms, min_contrast), 100);
        assert_eq!(offset_of!(Uniforms, cursor_pos), 104);
        assert_eq!(offset_of!(Uniforms, cursor_color), 108);
        assert_eq!(offset_of!(Uniforms, bg_color), 112);
        assert_eq!(offset_of!(Uniforms, flags), 116);
        assert_eq!(offset_of!(Uniforms, grid_padding) % 16, 0);
    }

    #[test]
    fn test_flag_fields_are_u32() {
        assert_eq!(size_of::<PaddingExtend>(), 4);
        assert_eq!(align_of::<PaddingExtend>(), 4);
        assert_eq!(size_of::<FrameFlags>(), 4);
        assert_eq!(align_of::<FrameFlags>(), 4);
    }

    #[test]
    fn test_padding_extend_bits() {
        let mut pe = PaddingExtend::LEFT | PaddingExtend::DOWN;
        assert!(pe.left());
        assert!(!pe.right());
        assert!(!pe.up());
        assert!(pe.down());
        assert_eq!(pe.bits(), 0b1001);

        pe.set(PaddingExtend::LEFT, false);
        pe.set(PaddingExtend::UP, true);
        assert_eq!(pe.bits(), 0b1100);
    }

    #[test]
    fn test_frame_flags_bits() {
        let mut flags = FrameFlags::default();
        assert_eq!(flags.bits(), 0);
        flags.set(FrameFlags::CURSOR_WIDE, true);
        flags.set(FrameFlags::LINEAR_BLENDING, true);
        assert!(flags.cursor_wide());
        assert!(!flags.display_p3());
        assert!(flags.linear_blending());
        assert!(!flags.linear_correction());
        assert_eq!(flags.bits(), 0b0101);
    }

    #[test]
    fn test_reserved_bits_rejected() {
        assert_eq!(PaddingExtend::from_bits(0b1111), Some(PaddingExtend::ALL));
        assert_eq!(PaddingExtend::from_bits(1 << 4), None);
        assert_eq!(FrameFlags::from_bits(0b1010), Some(FrameFlags::DISPLAY_P3 | FrameFlags::LINEAR_CORRECTION));
        assert_eq!(FrameFlags::from_bits(0x8000_0000), None);
    }

    #[test]
    fn test_setting_every_flag_leaves_reserved_bits_zero() {
        let mut flags = FrameFlags::NONE;
        let mut pe = PaddingExtend::NONE;
        for f in [FrameFlags::CURSOR_WIDE, FrameFlags::DISPLAY_P3, FrameFlags::LINEAR_BLENDING, FrameFlags::LINEAR_CORRECTION] {
            flags.set(f, true);
        }
        for p in [PaddingExtend::LEFT, PaddingExtend::RIGHT, PaddingExtend::UP, PaddingExtend::DOWN] {
            pe.set(p, true);
        }
        assert_eq!(flags.bits() & !0b1111, 0);
        assert_eq!(pe.bits() & !0b1111, 0);
    }

    #[test]
    fn test_uniforms_decode_checks_reserved_bits() {
        let mut uniforms = Uniforms::new(800.0, 600.0, [8.0, 16.0], [100, 37]);
        uniforms.flags = FrameFlags::LINEAR_BLENDING;
        uniforms.padding_extend = PaddingExtend::ALL;

        let decoded = Uniforms::from_bytes(uniforms.as_bytes()).unwrap();
        assert_eq!(decoded, uniforms);

        let mut bytes = uniforms.as_bytes().to_vec();
        bytes[116 + 3] = 0x80;
        assert!(Uniforms::from_bytes(&bytes).is_none());

        let mut bytes = uniforms.as_bytes().to_vec();
        bytes[96] = 0xff;
        assert!(Uniforms::from_bytes(&bytes).is_none());

        assert!(Uniforms::from_bytes(&bytes[..64]).is_none());
    }

    #[test]
    fn test_uniforms_default_padding_is_zero() {
        let uniforms = Uniforms::new(100.0, 100.0, [10.0, 20.0], [10, 5]);
        let bytes = uniforms.as_bytes();
        assert!(bytes[76..80].iter().all(|b| *b == 0));
        assert!(bytes[120..128].iter().all(|b| *b == 0));
        assert_eq!(&bytes[72..76], &[10, 0, 5, 0]);
    }

    #[test]
    fn test_ortho2d_maps_corners() {
        let m = ortho2d(0.0, 800.0, 600.0, 0.0);
        let apply = |x: f32, y: f32| {
            (
                m[0][0] * x + m[1][0] * y + m[3][0],
                m[0][1] * x + m[1][1] * y + m[3][1],
            )
        };
        let close = |(x, y): (f32, f32), (ex, ey): (f32, f32)| {
            (x - ex).abs() < 1e-5 && (y - ey).abs() < 1e-5
        };
        assert!(close(apply(0.0, 0.0), (-1.0, 1.0)));
        assert!(close(apply(800.0, 600.0), (1.0, -1.0)));
        assert!(close(apply(400.0, 300.0), (0.0, 0.0)));
    }
}
