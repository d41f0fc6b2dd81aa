//! Software drawing surfaces.
//!
//! [`PixelSurface`] rasterises rectangles into an RGBA8888 buffer and can be
//! dumped as a frame with the 8-byte header used across the workspace:
//!
//! - bytes `0..4`: frame id, `u32` little-endian (number of clears so far)
//! - bytes `4..6`: width, `u16` little-endian
//! - bytes `6..8`: height, `u16` little-endian
//! - then `width * height * 4` bytes of RGBA
//!
//! Text is not rasterised; it is kept as a log of drawn strings.
//! [`RecordingSurface`] keeps every call as a [`DrawOp`] instead.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use guest_abi::{Paint, Rect, RenderSurface};

/// Size of the frame header in bytes.
pub const FRAME_HEADER: usize = 8;

struct Pixels {
    width: u16,
    height: u16,
    rgba: Vec<u8>,
    fill: Paint,
    stroke: Paint,
    font: String,
    texts: Vec<String>,
    frames: u32,
}

impl Pixels {
    fn blend_rect(&mut self, rect: Rect, paint: Paint) {
        let xs = span(rect.x, rect.width, self.width);
        let ys = span(rect.y, rect.height, self.height);
        let alpha = paint.alpha;
        let [r, g, b] = paint.rgb;
        let src = [r, g, b, 255];
        for y in ys {
            for x in xs.clone() {
                let o = (y as usize * self.width as usize + x as usize) * 4;
                for (dst, src) in self.rgba[o..o + 4].iter_mut().zip(src) {
                    *dst = (f64::from(src) * alpha + f64::from(*dst) * (1.0 - alpha)).round() as u8;
                }
            }
        }
    }
}

/// Pixels whose centres fall inside `[start, start + len)`, clipped to `limit`.
fn span(start: f64, len: f64, limit: u16) -> Range<u32> {
    let (lo, hi) = if len < 0.0 {
        (start + len, start)
    } else {
        (start, start + len)
    };
    let limit = f64::from(limit);
    let lo = (lo - 0.5).ceil().clamp(0.0, limit) as u32;
    let hi = (hi - 0.5).ceil().clamp(0.0, limit) as u32;
    lo..hi
}

/// RGBA software surface. Clones share the same buffer.
#[derive(Clone)]
pub struct PixelSurface {
    inner: Rc<RefCell<Pixels>>,
}

impl PixelSurface {
    /// Creates a transparent surface.
    pub fn new(width: u16, height: u16) -> Self {
        let opaque_black = Paint::from_unit(0.0, 0.0, 0.0, 1.0);
        Self {
            inner: Rc::new(RefCell::new(Pixels {
                width,
                height,
                rgba: vec![0; usize::from(width) * usize::from(height) * 4],
                fill: opaque_black,
                stroke: opaque_black,
                font: String::new(),
                texts: Vec::new(),
                frames: 0,
            })),
        }
    }

    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 4]> {
        let pixels = self.inner.borrow();
        if x >= pixels.width || y >= pixels.height {
            return None;
        }
        let o = (usize::from(y) * usize::from(pixels.width) + usize::from(x)) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&pixels.rgba[o..o + 4]);
        Some(out)
    }

    /// Strings drawn since the last clear, prefixed by the active font.
    pub fn texts(&self) -> Vec<String> {
        self.inner.borrow().texts.clone()
    }

    /// Number of times the surface was cleared.
    pub fn frames(&self) -> u32 {
        self.inner.borrow().frames
    }

    /// Header plus RGBA payload of the current contents.
    pub fn encode_frame(&self) -> Vec<u8> {
        let pixels = self.inner.borrow();
        let mut out = Vec::with_capacity(FRAME_HEADER + pixels.rgba.len());
        out.extend_from_slice(&pixels.frames.to_le_bytes());
        out.extend_from_slice(&pixels.width.to_le_bytes());
        out.extend_from_slice(&pixels.height.to_le_bytes());
        out.extend_from_slice(&pixels.rgba);
        out
    }
}

/// Decodes a frame header, returning `(frame_id, width, height)`.
///
/// Returns `None` if `frame` is too short to contain one.
pub fn decode_header(frame: &[u8]) -> Option<(u32, u16, u16)> {
    if frame.len() < FRAME_HEADER {
        return None;
    }
    let id = u32::from_le_bytes(frame[0..4].try_into().ok()?);
    let w = u16::from_le_bytes(frame[4..6].try_into().ok()?);
    let h = u16::from_le_bytes(frame[6..8].try_into().ok()?);
    Some((id, w, h))
}

impl RenderSurface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        let pixels = self.inner.borrow();
        (u32::from(pixels.width), u32::from(pixels.height))
    }

    fn clear(&mut self) {
        let mut pixels = self.inner.borrow_mut();
        pixels.rgba.fill(0);
        pixels.texts.clear();
        pixels.frames = pixels.frames.wrapping_add(1);
    }

    fn set_fill_style(&mut self, paint: Paint) {
        self.inner.borrow_mut().fill = paint;
    }

    fn set_stroke_style(&mut self, paint: Paint) {
        self.inner.borrow_mut().stroke = paint;
    }

    fn set_font(&mut self, font: &str) {
        self.inner.borrow_mut().font = font.to_owned();
    }

    fn fill_rect(&mut self, rect: Rect) {
        let mut pixels = self.inner.borrow_mut();
        let paint = pixels.fill;
        pixels.blend_rect(rect, paint);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let mut pixels = self.inner.borrow_mut();
        let paint = pixels.stroke;
        let Rect {
            x,
            y,
            width,
            height,
        } = rect;
        pixels.blend_rect(Rect::new(x - 0.5, y - 0.5, width + 1.0, 1.0), paint);
        pixels.blend_rect(Rect::new(x - 0.5, y + height - 0.5, width + 1.0, 1.0), paint);
        pixels.blend_rect(Rect::new(x - 0.5, y + 0.5, 1.0, height - 1.0), paint);
        pixels.blend_rect(Rect::new(x + width - 0.5, y + 0.5, 1.0, height - 1.0), paint);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let mut pixels = self.inner.borrow_mut();
        let entry = format!("{} @({x},{y}) {text}", pixels.font);
        pixels.texts.push(entry);
    }
}

/// One call made on a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// `clear`
    Clear,
    /// `set_fill_style`
    FillStyle(Paint),
    /// `set_stroke_style`
    StrokeStyle(Paint),
    /// `set_font`
    Font(String),
    /// `fill_rect`
    FillRect(Rect),
    /// `stroke_rect`
    StrokeRect(Rect),
    /// `fill_text`
    Text {
        /// Drawn string.
        text: String,
        /// Baseline x.
        x: f64,
        /// Baseline y.
        y: f64,
    },
}

/// Surface that records calls. Clones share the log.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    size: (u32, u32),
    ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl RecordingSurface {
    /// Creates an empty recording of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ops: Rc::default(),
        }
    }

    /// Calls recorded so far.
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }

    fn record(&self, op: DrawOp) {
        self.ops.borrow_mut().push(op);
    }
}

impl RenderSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }
    fn clear(&mut self) {
        self.record(DrawOp::Clear);
    }
    fn set_fill_style(&mut self, paint: Paint) {
        self.record(DrawOp::FillStyle(paint));
    }
    fn set_stroke_style(&mut self, paint: Paint) {
        self.record(DrawOp::StrokeStyle(paint));
    }
    fn set_font(&mut self, font: &str) {
        self.record(DrawOp::Font(font.to_owned()));
    }
    fn fill_rect(&mut self, rect: Rect) {
        self.record(DrawOp::FillRect(rect));
    }
    fn stroke_rect(&mut self, rect: Rect) {
        self.record(DrawOp::StrokeRect(rect));
    }
    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.record(DrawOp::Text {
            text: text.to_owned(),
            x,
            y,
        });
    }
}
