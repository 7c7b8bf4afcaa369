use crate::error::RenderError;
use fixed::types::I32F32;

/// Layout length in PDF points, quantized to 1/1000 pt.
///
/// All vertical bookkeeping goes through this type so that two renders of the
/// same input produce the same page breaks on every platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

const FRAC_ONE: i128 = 1 << 32;

// Rounds num/den to the nearest integer, halves away from zero.
fn round_div(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let half = den.abs() / 2;
    let magnitude = (num.abs() + half) / den.abs();
    if (num < 0) != (den < 0) { -magnitude } else { magnitude }
}

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    fn milli(self) -> i128 {
        round_div(self.0.to_bits() as i128 * 1000, FRAC_ONE)
    }

    fn with_milli(milli: i128) -> Pt {
        let bits = round_div(milli.saturating_mul(FRAC_ONE), 1000);
        Pt(I32F32::from_bits(bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64))
    }

    /// Non-finite input maps to zero.
    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        Pt::with_milli((f64::from(value) * 1000.0).round() as i128)
    }

    pub fn from_i32(value: i32) -> Pt {
        Pt::with_milli(i128::from(value) * 1000)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        self.milli().clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn max(self, other: Pt) -> Pt {
        if other > self { other } else { self }
    }

    pub fn min(self, other: Pt) -> Pt {
        if other < self { other } else { self }
    }

    /// `self * num / denom` on milli-points; a zero denominator yields zero.
    pub fn mul_ratio(self, num: i32, denom: i32) -> Pt {
        Pt::with_milli(round_div(
            self.milli().saturating_mul(i128::from(num)),
            i128::from(denom),
        ))
    }
}

impl std::fmt::Display for Pt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let milli = self.milli();
        let whole = milli.abs() / 1000;
        let frac = milli.abs() % 1000;
        if milli < 0 {
            write!(f, "-{whole}.{frac:03}")
        } else {
            write!(f, "{whole}.{frac:03}")
        }
    }
}

macro_rules! milli_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign:ident, $op:tt) => {
        impl std::ops::$trait for Pt {
            type Output = Pt;
            fn $method(self, rhs: Pt) -> Pt {
                Pt::with_milli(self.milli() $op rhs.milli())
            }
        }

        impl std::ops::$assign_trait for Pt {
            fn $assign(&mut self, rhs: Pt) {
                *self = *self $op rhs;
            }
        }
    };
}

milli_op!(Add, add, AddAssign, add_assign, +);
milli_op!(Sub, sub, SubAssign, sub_assign, -);

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        Pt::with_milli(self.milli().saturating_mul(i128::from(rhs)))
    }
}

impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        Pt::with_milli(round_div(self.milli(), i128::from(rhs)))
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::with_milli(-self.milli())
    }
}

impl std::iter::Sum for Pt {
    fn sum<I: Iterator<Item = Pt>>(iter: I) -> Pt {
        iter.fold(Pt::ZERO, |acc, v| acc + v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
        }
    }

    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self::new(612.0, 792.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Pt,
    pub right: Pt,
    pub bottom: Pt,
    pub left: Pt,
}

impl Margins {
    pub fn all(value: f32) -> Self {
        let v = Pt::from_f32(value);
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top: Pt::from_f32(top),
            right: Pt::from_f32(right),
            bottom: Pt::from_f32(bottom),
            left: Pt::from_f32(left),
        }
    }
}

/// Page size plus margins; the only geometry a render needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub size: Size,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn new(size: Size, margins: Margins) -> Self {
        Self { size, margins }
    }

    pub fn content_width(&self) -> Pt {
        self.size.width - self.margins.left - self.margins.right
    }

    pub fn usable_height(&self) -> Pt {
        self.size.height - self.margins.top - self.margins.bottom
    }

    /// Rejects geometries whose margins leave no positive content area.
    pub fn validate(&self) -> Result<(), RenderError> {
        let margins = [
            self.margins.top,
            self.margins.right,
            self.margins.bottom,
            self.margins.left,
        ];
        if margins.iter().any(|m| *m < Pt::ZERO) {
            return Err(RenderError::InvalidGeometry(
                "margins must not be negative".to_string(),
            ));
        }
        if self.content_width() <= Pt::ZERO {
            return Err(RenderError::InvalidGeometry(format!(
                "page width {} leaves no content width after margins {} + {}",
                self.size.width, self.margins.left, self.margins.right
            )));
        }
        if self.usable_height() <= Pt::ZERO {
            return Err(RenderError::InvalidGeometry(format!(
                "page height {} leaves no content height after margins {} + {}",
                self.size.height, self.margins.top, self.margins.bottom
            )));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::new(Size::letter(), Margins::all(40.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const GREY: Color = Color {
        r: 0.5,
        g: 0.5,
        b: 0.5,
    };
    pub const LIGHT_GREY: Color = Color {
        r: 0.827,
        g: 0.827,
        b: 0.827,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`. Anything else yields black.
    pub fn from_hex(raw: &str) -> Self {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Color::BLACK;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| v as f32 / 255.0)
                .ok()
        };
        match (channel(0..2), channel(2..4), channel(4..6)) {
            (Some(r), Some(g), Some(b)) => Color { r, g, b },
            _ => Color::BLACK,
        }
    }
}
