//! Drawing surface collaborator used by the guest's paint imports.

/// Paint colour decoded from the guest's unit-float channels.
///
/// Alpha is applied as the surface's global alpha, matching 2D canvas
/// semantics where the colour itself stays opaque.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    /// Red, green, blue bytes.
    pub rgb: [u8; 3],
    /// Global alpha in `0.0..=1.0`.
    pub alpha: f64,
}

impl Paint {
    /// Converts unit-float channels, each mapped to `floor(255 * f)` and clamped.
    pub fn from_unit(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            rgb: [unit_to_byte(r), unit_to_byte(g), unit_to_byte(b)],
            alpha: if a.is_nan() { 0.0 } else { a.clamp(0.0, 1.0) },
        }
    }

    /// CSS colour string for canvas-like backends.
    pub fn css(&self) -> String {
        let [r, g, b] = self.rgb;
        format!("rgba({r},{g},{b})")
    }
}

fn unit_to_byte(f: f64) -> u8 {
    // NaN saturates to 0 through the cast.
    (255.0 * f).floor().clamp(0.0, 255.0) as u8
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Host-owned 2D drawing surface.
///
/// Implementations are installed once discovery succeeds and are only touched
/// from the serialised guest execution context.
pub trait RenderSurface {
    /// Surface dimensions in pixels.
    fn size(&self) -> (u32, u32);

    /// Clears the whole surface.
    fn clear(&mut self);

    /// Sets the fill paint (and global alpha).
    fn set_fill_style(&mut self, paint: Paint);

    /// Sets the stroke paint (and global alpha).
    fn set_stroke_style(&mut self, paint: Paint);

    /// Sets the text font descriptor.
    fn set_font(&mut self, font: &str);

    /// Fills `rect` with the current fill paint.
    fn fill_rect(&mut self, rect: Rect);

    /// Outlines `rect` with the current stroke paint.
    fn stroke_rect(&mut self, rect: Rect);

    /// Draws `text` at `(x, y)` with the current font and fill paint.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
}
