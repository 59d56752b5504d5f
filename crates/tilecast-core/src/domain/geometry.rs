//! Small value types shared by the compositor and the graphics layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which output view a video channel or placeholder belongs to.
///
/// A mono window has a single output and every tile uses [`Eye::Mono`].  A
/// stereo window has a left and a right output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
    Mono,
}

impl Eye {
    /// Index of the output attachment this eye renders into.
    ///
    /// Mono shares the primary (left) output.
    pub fn output_index(self) -> usize {
        match self {
            Eye::Left | Eye::Mono => 0,
            Eye::Right => 1,
        }
    }

    /// Eyes used by a window with the given stereo setting, in draw order.
    pub fn for_window(stereo: bool) -> &'static [Eye] {
        if stereo {
            &[Eye::Left, Eye::Right]
        } else {
            &[Eye::Mono]
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Eye::Left => "left",
            Eye::Right => "right",
            Eye::Mono => "mono",
        };
        f.write_str(s)
    }
}

/// Screen-space rectangle in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Size of the rectangle with each dimension clamped to at least 1.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Output or texture size in pixels.  Never zero in either dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Creates a size, clamping each dimension to at least 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Creates a size from signed window-system dimensions.
    ///
    /// Minimised windows commonly report zero or negative sizes; those clamp
    /// to 1.
    pub fn from_signed(width: i64, height: i64) -> Self {
        let clamp = |v: i64| v.clamp(1, i64::from(u32::MAX)) as u32;
        Self::new(clamp(width), clamp(height))
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identity of the physical graphics processor a device or frame lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AcceleratorId(pub u64);

impl fmt::Display for AcceleratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "accelerator#{}", self.0)
    }
}

/// Texel formats a producer may publish frames in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgb10A2Unorm,
}

impl PixelFormat {
    /// Size of one texel in bytes.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba16Float => 8,
            _ => 4,
        }
    }
}
