//! Compiled-in page geometry and pipeline thresholds.
//!
//! The stylesheet, the rendering passes and the page stamper all read these,
//! so a change here moves every stage together.

/// Physical trim size, inches.
pub const TRIM_WIDTH_IN: f64 = 7.0;
pub const TRIM_HEIGHT_IN: f64 = 10.0;

/// Physical page margins, inches.
pub const MARGIN_TOP_IN: f64 = 0.85;
pub const MARGIN_BOTTOM_IN: f64 = 0.85;
pub const MARGIN_LEFT_IN: f64 = 1.0;
pub const MARGIN_RIGHT_IN: f64 = 0.75;

/// Chapter-level sections rendered per body pass.
pub const SECTIONS_PER_BATCH: usize = 5;

/// Approximate maximum document height (CSS px) the engine renders without
/// truncating output.
pub const MAX_RENDER_HEIGHT_PX: u64 = 65_000;

/// A fence with at least this many lines may be a diagram.
pub const DIAGRAM_MIN_LINES: usize = 5;

/// A fence is a diagram when more than this share of its lines carries a
/// box-drawing glyph.
pub const DIAGRAM_BOX_LINE_RATIO: f64 = 0.3;

/// Box-drawing glyphs that mark a line as part of an ASCII diagram.
pub const BOX_DRAWING_GLYPHS: &[char] = &[
    '┌', '┐', '└', '┘', '│', '─', '┬', '┴', '├', '┤', '▶', '◀', '▼', '▲', '═', '║', '╔', '╗', '╚',
    '╝', '╠', '╣', '╦', '╩',
];

/// Fences longer than this may break across pages.
pub const LONG_CODE_LINES: usize = 35;

/// Page-number stamp placement and tone.
pub const STAMP_FONT_SIZE: f32 = 8.0;
pub const STAMP_BOTTOM_OFFSET_PT: f32 = 36.0;
pub const STAMP_GRAY: f32 = 0.53;
