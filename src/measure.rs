use crate::error::MeasureError;
use crate::types::Pt;

/// Sizes rendered text. Implementations must be deterministic for identical
/// inputs; pagination is only reproducible if widths are.
pub trait TextMeasurer: Send + Sync {
    fn text_width(&self, text: &str, font_name: &str, font_size: Pt) -> Result<Pt, MeasureError>;
}

/// Every char advances by the same fraction of the font size.
///
/// This is the metric the engine falls back to for the base-14 fonts, and the
/// measurer tests use when no font files are around.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMeasurer {
    num: i32,
    denom: i32,
}

impl FixedAdvanceMeasurer {
    pub fn new(num: i32, denom: i32) -> Self {
        Self {
            num: num.max(0),
            denom: denom.max(1),
        }
    }

    pub fn char_width(&self, font_size: Pt) -> Pt {
        font_size.mul_ratio(self.num, self.denom)
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self::new(3, 5)
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn text_width(&self, text: &str, _font_name: &str, font_size: Pt) -> Result<Pt, MeasureError> {
        Ok(self.char_width(font_size) * (text.chars().count() as i32))
    }
}
