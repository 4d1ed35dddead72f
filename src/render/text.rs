//! # Text Rendering
//!
//! Two jobs:
//!
//! - [`filter_ascii`] prepares text for the device's built-in font (ASCII
//!   direct-print mode).
//! - [`render_text`] rasterizes text with a chosen font into an image exactly
//!   as wide as the printer, word-wrapping to fit.
//!
//! ## Fonts
//!
//! | Source | Renderer | Edges |
//! |--------|----------|-------|
//! | [`FontSource::Builtin`] | Spleen bitmap font (6x12, 12x24), integer scaled | Hard |
//! | [`FontSource::File`] | TrueType/OpenType via `ab_glyph` | Anti-aliased |
//!
//! ## Unrenderable Characters
//!
//! Characters are dropped, never fatal:
//! - ASCII mode keeps `0x20..=0x7E` and `\n`; everything else is removed.
//! - Font rendering drops characters the font has no glyph for. Tabs expand
//!   to four spaces and carriage returns are removed.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont};
use image::{GrayImage, Luma};
use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};

use super::dither::DitherMode;
use super::raster::{self, Bitmap};
use super::resample::ResamplePolicy;
use crate::error::{PeripageError, Result};

const TAB_WIDTH: usize = 4;

/// Result of ASCII filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredAscii {
    pub text: String,
    /// Number of characters removed
    pub dropped: usize,
}

/// Keep printable ASCII and newlines, drop everything else.
///
/// ```
/// use peripage::render::text::filter_ascii;
///
/// let filtered = filter_ascii("naïve\tcafé\n");
/// assert_eq!(filtered.text, "navecaf\n");
/// assert_eq!(filtered.dropped, 3);
/// ```
pub fn filter_ascii(text: &str) -> FilteredAscii {
    let mut dropped = 0;
    let text = text
        .chars()
        .filter(|&c| {
            let keep = c == '\n' || (' '..='~').contains(&c);
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();
    FilteredAscii { text, dropped }
}

// ============================================================================
// FONTS
// ============================================================================

/// Where glyphs come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FontSource {
    /// Spleen bitmap font compiled into the crate
    #[default]
    Builtin,
    /// TrueType/OpenType file on disk
    File(PathBuf),
}

/// A font ready for rendering.
#[derive(Clone)]
pub enum LoadedFont {
    Spleen,
    TrueType(FontArc),
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadedFont::Spleen => f.write_str("Spleen"),
            LoadedFont::TrueType(_) => f.write_str("TrueType"),
        }
    }
}

/// Load the font named by `source`.
///
/// ## Errors
///
/// [`PeripageError::FontLoad`] if the file is missing, unreadable, or not a
/// font.
pub fn load_font(source: &FontSource) -> Result<LoadedFont> {
    match source {
        FontSource::Builtin => {
            if PSF2Font::new(FONT_12X24).is_err() || PSF2Font::new(FONT_6X12).is_err() {
                return Err(PeripageError::FontLoad {
                    path: PathBuf::from("<builtin spleen>"),
                    reason: "embedded font data is corrupt".to_string(),
                });
            }
            Ok(LoadedFont::Spleen)
        }
        FontSource::File(path) => load_font_file(path),
    }
}

fn load_font_file(path: &Path) -> Result<LoadedFont> {
    let bytes = fs::read(path).map_err(|e| PeripageError::FontLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let font = FontArc::try_from_vec(bytes).map_err(|e| PeripageError::FontLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(LoadedFont::TrueType(font))
}

/// Size and spacing for [`render_text`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    /// Glyph height in pixels
    pub font_size: f32,
    /// Blank pixel rows between consecutive lines
    pub line_break: usize,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            font_size: 20.0,
            line_break: 2,
        }
    }
}

/// Per-render glyph source with uniform metrics.
enum Face<'a> {
    Spleen {
        data: &'static [u8],
        cell_w: usize,
        cell_h: usize,
        scale: usize,
    },
    TrueType {
        font: &'a FontArc,
        px: f32,
    },
}

impl<'a> Face<'a> {
    fn new(font: &'a LoadedFont, font_size: f32) -> Self {
        match font {
            LoadedFont::Spleen => {
                // 6x12 up to 18px, then 12x24 scaled by whole multiples
                let (data, cell_w, cell_h): (&'static [u8], usize, usize) = if font_size <= 18.0 {
                    (FONT_6X12, 6, 12)
                } else {
                    (FONT_12X24, 12, 24)
                };
                let scale = ((font_size / cell_h as f32).round() as usize).max(1);
                Face::Spleen {
                    data,
                    cell_w,
                    cell_h,
                    scale,
                }
            }
            LoadedFont::TrueType(font) => Face::TrueType {
                font,
                px: font_size,
            },
        }
    }

    fn line_height(&self) -> usize {
        match self {
            Face::Spleen { cell_h, scale, .. } => cell_h * scale,
            Face::TrueType { font, px } => {
                let scaled = font.as_scaled(*px);
                (scaled.ascent() - scaled.descent()).ceil().max(1.0) as usize
            }
        }
    }

    /// Horizontal advance, or `None` if the font cannot draw `ch`.
    fn advance(&self, ch: char) -> Option<f32> {
        match self {
            Face::Spleen {
                data,
                cell_w,
                scale,
                ..
            } => spleen_glyph(data, *cell_w, ch).map(|_| (cell_w * scale) as f32),
            Face::TrueType { font, px } => {
                let id = font.glyph_id(ch);
                if id == GlyphId(0) {
                    return None;
                }
                Some(font.as_scaled(*px).h_advance(id))
            }
        }
    }

    fn draw(&self, ch: char, x: f32, top: usize, canvas: &mut Canvas) {
        match self {
            Face::Spleen {
                data,
                cell_w,
                cell_h,
                scale,
            } => {
                let Some(cell) = spleen_glyph(data, *cell_w, ch) else {
                    return;
                };
                let x0 = x.round() as usize;
                for gy in 0..*cell_h {
                    for gx in 0..*cell_w {
                        if !cell.get(gy * cell_w + gx).copied().unwrap_or(false) {
                            continue;
                        }
                        for sy in 0..*scale {
                            for sx in 0..*scale {
                                canvas.ink(x0 + gx * scale + sx, top + gy * scale + sy, 1.0);
                            }
                        }
                    }
                }
            }
            Face::TrueType { font, px } => {
                let scaled = font.as_scaled(*px);
                let baseline = top as f32 + scaled.ascent();
                let glyph = font
                    .glyph_id(ch)
                    .with_scale_and_position(*px, ab_glyph::point(x, baseline));
                if let Some(outlined) = font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let cx = gx as i64 + bounds.min.x as i64;
                        let cy = gy as i64 + bounds.min.y as i64;
                        if cx >= 0 && cy >= 0 {
                            canvas.ink(cx as usize, cy as usize, coverage);
                        }
                    });
                }
            }
        }
    }
}

/// Row-major on/off cells for `ch`, or `None` when Spleen has no glyph.
fn spleen_glyph(data: &'static [u8], cell_w: usize, ch: char) -> Option<Vec<bool>> {
    let mut font = PSF2Font::new(data).ok()?;
    let mut buf = [0u8; 4];
    let glyph = font.glyph_for_utf8(ch.encode_utf8(&mut buf).as_bytes())?;

    let mut cells = Vec::new();
    for row in glyph {
        let mut bits: Vec<bool> = row.collect();
        bits.resize(cell_w, false);
        cells.extend(bits);
    }
    Some(cells)
}

/// Ink accumulation buffer: 0.0 = paper, 1.0 = solid black.
struct Canvas {
    width: usize,
    height: usize,
    ink: Vec<f32>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ink: vec![0.0; width * height],
        }
    }

    fn ink(&mut self, x: usize, y: usize, coverage: f32) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            self.ink[idx] = (self.ink[idx] + coverage).min(1.0);
        }
    }

    fn into_gray(self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let ink = self.ink[y as usize * self.width + x as usize];
            Luma([(255.0 - ink * 255.0).round() as u8])
        })
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Greedy word wrap. Words wider than `max_width` are broken between
/// characters. Each returned line holds only drawable characters.
fn wrap_lines(text: &str, face: &Face<'_>, max_width: f32) -> Vec<Vec<(char, f32)>> {
    let space = face.advance(' ').unwrap_or(0.0);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph
            .replace('\r', "")
            .replace('\t', &" ".repeat(TAB_WIDTH));
        let mut line: Vec<(char, f32)> = Vec::new();
        let mut line_width = 0.0f32;

        let mut first = true;

        for word in paragraph.split(' ') {
            let glyphs: Vec<(char, f32)> = word
                .chars()
                .filter_map(|c| face.advance(c).map(|adv| (c, adv)))
                .collect();
            let word_width: f32 = glyphs.iter().map(|&(_, adv)| adv).sum();

            if !first {
                if !line.is_empty() && line_width + space + word_width > max_width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                } else {
                    line.push((' ', space));
                    line_width += space;
                }
            }
            first = false;

            for glyph in glyphs {
                if !line.is_empty() && line_width + glyph.1 > max_width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line_width += glyph.1;
                line.push(glyph);
            }
        }

        lines.push(line);
    }

    lines
}

/// Rasterize `text` to a grayscale image exactly `width` pixels wide.
///
/// Height is `lines × line_height + (lines - 1) × line_break`.
///
/// ## Errors
///
/// [`PeripageError::InvalidArgument`] for a non-positive font size or zero
/// width.
pub fn render_text_gray(
    text: &str,
    font: &LoadedFont,
    layout: TextLayout,
    width: usize,
) -> Result<GrayImage> {
    if layout.font_size.is_nan() || layout.font_size <= 0.0 {
        return Err(PeripageError::InvalidArgument(format!(
            "Font size must be positive, got {}",
            layout.font_size
        )));
    }
    if width == 0 {
        return Err(PeripageError::InvalidArgument(
            "Text width must be positive".to_string(),
        ));
    }

    let face = Face::new(font, layout.font_size);
    let lines = wrap_lines(text, &face, width as f32);
    let line_height = face.line_height();
    let pitch = line_height + layout.line_break;
    let height = (lines.len() * pitch).saturating_sub(layout.line_break).max(1);

    let mut canvas = Canvas::new(width, height);
    for (i, line) in lines.iter().enumerate() {
        let top = i * pitch;
        let mut x = 0.0f32;
        for &(ch, advance) in line {
            if ch != ' ' {
                face.draw(ch, x, top, &mut canvas);
            }
            x += advance;
        }
    }

    Ok(canvas.into_gray())
}

/// [`render_text_gray`] followed by 1-bit conversion.
pub fn render_text(
    text: &str,
    font: &LoadedFont,
    layout: TextLayout,
    width: usize,
    dither: DitherMode,
) -> Result<Bitmap> {
    let gray = render_text_gray(text, font, layout, width)?;
    raster::encode_gray(&gray, width, ResamplePolicy::Box, dither)
}

// ============================================================================
// TESTS
// ============================================================================
