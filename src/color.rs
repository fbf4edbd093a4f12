//! Color model for surface illumination
//!
//! Parses user-facing color values into RGB and maps a control id plus a
//! color onto whatever its LED supports: full RGB pads, small fixed-palette
//! buttons, or nothing at all.

use crate::device::ControlId;
use crate::error::ColorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First control id of the Fire's 4x16 RGB pad grid
pub const PAD_START: ControlId = 54;
/// Last control id of the RGB pad grid (inclusive)
pub const PAD_END: ControlId = 117;

/// Largest value representable as 0xRRGGBB
const RGB_MAX: i64 = 0xFF_FFFF;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorValue {
    pub const BLACK: ColorValue = ColorValue::new(0, 0, 0);
    pub const WHITE: ColorValue = ColorValue::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a 0xRRGGBB integer (upper bits ignored)
    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Components scaled to the 7-bit range the Fire SysEx expects
    pub fn to_7bit(self) -> (u8, u8, u8) {
        (self.r >> 1, self.g >> 1, self.b >> 1)
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.to_u32())
    }
}

/// Raw color as it appears in JSON (number or hex string)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawColor {
    Numeric(i64),
    Text(String),
}

/// Parse a color from an integer or a hex string (`FF0000`, `0xFF0000`, `#FF0000`)
pub fn parse_color(value: &RawColor) -> Result<ColorValue, ColorError> {
    match value {
        RawColor::Numeric(n) => from_integer(*n),
        RawColor::Text(s) => parse_hex(s),
    }
}

fn from_integer(n: i64) -> Result<ColorValue, ColorError> {
    if !(0..=RGB_MAX).contains(&n) {
        return Err(ColorError::InvalidColorFormat(format!(
            "{} is outside 0x000000..=0xFFFFFF",
            n
        )));
    }
    Ok(ColorValue::from_u32(n as u32))
}

fn parse_hex(s: &str) -> Result<ColorValue, ColorError> {
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();
    let digits = lower
        .strip_prefix("0x")
        .or_else(|| lower.strip_prefix('#'))
        .unwrap_or(&lower);

    // from_str_radix accepts a leading '+', which is not a color
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidColorFormat(format!("'{}'", trimmed)));
    }

    let value = i64::from_str_radix(digits, 16)
        .map_err(|_| ColorError::InvalidColorFormat(format!("'{}'", trimmed)))?;
    from_integer(value)
}

/// Fixed-palette LED classes found on the Fire's function buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteClass {
    Red,
    Green,
    RedYellow,
    GreenYellow,
    Yellow,
}

const DULL_RED: ColorValue = ColorValue::from_u32(0x7F_0000);
const RED: ColorValue = ColorValue::from_u32(0xFF_0000);
const DULL_GREEN: ColorValue = ColorValue::from_u32(0x00_7F00);
const GREEN: ColorValue = ColorValue::from_u32(0x00_FF00);
const DULL_YELLOW: ColorValue = ColorValue::from_u32(0x7F_7F00);
const YELLOW: ColorValue = ColorValue::from_u32(0xFF_FF00);

impl PaletteClass {
    /// Code that turns the LED off
    pub const OFF: u8 = 0;

    /// Enumerated (code, color) pairs, excluding off
    pub fn codes(self) -> &'static [(u8, ColorValue)] {
        match self {
            PaletteClass::Red => &[(1, DULL_RED), (2, RED)],
            PaletteClass::Green => &[(1, DULL_GREEN), (2, GREEN)],
            PaletteClass::RedYellow => &[(1, DULL_RED), (2, DULL_YELLOW), (3, RED), (4, YELLOW)],
            PaletteClass::GreenYellow => {
                &[(1, DULL_GREEN), (2, DULL_YELLOW), (3, GREEN), (4, YELLOW)]
            }
            PaletteClass::Yellow => &[(1, DULL_YELLOW), (2, YELLOW)],
        }
    }

    /// Exact match against the enumerated colors, otherwise off
    pub fn code_for(self, color: ColorValue) -> u8 {
        self.codes()
            .iter()
            .find(|(_, c)| *c == color)
            .map(|(code, _)| *code)
            .unwrap_or(Self::OFF)
    }
}

/// What kind of LED a control has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlluminationClass {
    RgbPad,
    Palette(PaletteClass),
    Unsupported,
}

/// Surface-level encoding of a color for one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceColorCommand {
    /// Full RGB; `pad` is the 0-based index into the pad grid
    Rgb { pad: u8, color: ColorValue },
    /// Palette code sent on the control's own CC number
    Palette { cc: u8, code: u8 },
    NoOp,
}

/// Which LED layout to assume for the connected surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceProfile {
    #[default]
    Fire,
    /// Any controller without addressable LEDs
    Generic,
}

impl SurfaceProfile {
    pub fn classify(self, control_id: ControlId) -> IlluminationClass {
        match self {
            SurfaceProfile::Generic => IlluminationClass::Unsupported,
            SurfaceProfile::Fire => classify_fire(control_id),
        }
    }

    pub fn encode(self, control_id: ControlId, color: ColorValue) -> DeviceColorCommand {
        match self.classify(control_id) {
            IlluminationClass::RgbPad => DeviceColorCommand::Rgb {
                pad: (control_id - PAD_START) as u8,
                color,
            },
            IlluminationClass::Palette(class) => DeviceColorCommand::Palette {
                cc: control_id as u8,
                code: class.code_for(color),
            },
            IlluminationClass::Unsupported => DeviceColorCommand::NoOp,
        }
    }
}

fn classify_fire(control_id: ControlId) -> IlluminationClass {
    match control_id {
        PAD_START..=PAD_END => IlluminationClass::RgbPad,
        // Pattern up/down, browser, grid left/right
        31..=35 => IlluminationClass::Palette(PaletteClass::Red),
        // Mute/solo 1-4
        36..=39 => IlluminationClass::Palette(PaletteClass::Green),
        // Step, note, drum, perform, shift, alt, pattern/song, record
        44..=50 | 53 => IlluminationClass::Palette(PaletteClass::RedYellow),
        51 => IlluminationClass::Palette(PaletteClass::GreenYellow),
        52 => IlluminationClass::Palette(PaletteClass::Yellow),
        _ => IlluminationClass::Unsupported,
    }
}

/// Encode a color for a control on the Fire layout
pub fn encode_for_control(control_id: ControlId, color: ColorValue) -> DeviceColorCommand {
    SurfaceProfile::Fire.encode(control_id, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> RawColor {
        RawColor::Text(s.to_string())
    }

    #[test]
    fn test_parse_prefixed_and_bare_hex() {
        let red = ColorValue::new(255, 0, 0);
        assert_eq!(parse_color(&text("0xFF0000")).unwrap(), red);
        assert_eq!(parse_color(&text("#ff0000")).unwrap(), red);
        assert_eq!(parse_color(&text("FF0000")).unwrap(), red);
        assert_eq!(parse_color(&text("  0Xff0000 ")).unwrap(), red);
        assert_eq!(parse_color(&RawColor::Numeric(0xFF0000)).unwrap(), red);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_color(&text("red")).is_err());
        assert!(parse_color(&text("")).is_err());
        assert!(parse_color(&text("0x")).is_err());
        assert!(parse_color(&text("+FF")).is_err());
        assert!(parse_color(&text("0x1000000")).is_err());
        assert!(parse_color(&RawColor::Numeric(-1)).is_err());
        assert!(parse_color(&RawColor::Numeric(0x1000000)).is_err());
    }

    #[test]
    fn test_seven_bit_scaling() {
        assert_eq!(ColorValue::WHITE.to_7bit(), (127, 127, 127));
        assert_eq!(ColorValue::new(0x80, 0x01, 0).to_7bit(), (64, 0, 0));
    }

    #[test]
    fn test_pad_encoding() {
        let cmd = encode_for_control(56, ColorValue::new(255, 0, 0));
        assert_eq!(
            cmd,
            DeviceColorCommand::Rgb {
                pad: 2,
                color: ColorValue::new(255, 0, 0)
            }
        );
        assert!(matches!(
            encode_for_control(PAD_END, ColorValue::WHITE),
            DeviceColorCommand::Rgb { pad: 63, .. }
        ));
    }

    #[test]
    fn test_palette_exact_match_and_off_fallback() {
        // Play button accepts green
        assert_eq!(
            encode_for_control(51, ColorValue::from_u32(0x00FF00)),
            DeviceColorCommand::Palette { cc: 51, code: 3 }
        );
        // White is not in the red class, so the LED goes off
        assert_eq!(
            encode_for_control(31, ColorValue::WHITE),
            DeviceColorCommand::Palette { cc: 31, code: 0 }
        );
        assert_eq!(
            encode_for_control(53, ColorValue::from_u32(0xFFFF00)),
            DeviceColorCommand::Palette { cc: 53, code: 4 }
        );
    }

    #[test]
    fn test_unsupported_controls_are_noop() {
        assert_eq!(encode_for_control(0, ColorValue::WHITE), DeviceColorCommand::NoOp);
        assert_eq!(encode_for_control(999, ColorValue::WHITE), DeviceColorCommand::NoOp);
        assert_eq!(
            SurfaceProfile::Generic.encode(60, ColorValue::WHITE),
            DeviceColorCommand::NoOp
        );
    }

    proptest! {
        #[test]
        fn prop_hex_and_integer_agree(value in 0u32..=0xFF_FFFF) {
            let from_int = parse_color(&RawColor::Numeric(value as i64)).unwrap();
            prop_assert_eq!(parse_color(&text(&format!("0x{:06X}", value))).unwrap(), from_int);
            prop_assert_eq!(parse_color(&text(&format!("#{:x}", value))).unwrap(), from_int);
            prop_assert_eq!(parse_color(&text(&format!("{:X}", value))).unwrap(), from_int);
        }

        #[test]
        fn prop_no_rgb_outside_pad_range(id in 0u32..1024, value in 0u32..=0xFF_FFFF) {
            prop_assume!(!(PAD_START..=PAD_END).contains(&id));
            let cmd = encode_for_control(id, ColorValue::from_u32(value));
            let is_rgb = matches!(cmd, DeviceColorCommand::Rgb { .. });
            prop_assert!(!is_rgb);
        }
    }
}
