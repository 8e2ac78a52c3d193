//! Color math for color assets: hex parsing plus RGB, CMYK and HSL
//! representations stored alongside each color.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::models::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Percentages 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cmyk {
    pub c: u8,
    pub m: u8,
    pub y: u8,
    pub k: u8,
}

/// Hue in degrees, saturation and lightness in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

/// Accepts `#RRGGBB`, `RRGGBB`, `#RGB` and `RGB`.
pub fn parse_hex(input: &str) -> Result<Rgb, AppError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::InvalidInput(format!("Invalid hex color: {}", input)));
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Invalid hex color: {}",
                input
            )))
        }
    };

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&expanded[range], 16)
            .map_err(|_| AppError::InvalidInput(format!("Invalid hex color: {}", input)))
    };

    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

fn unit_to_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_percent(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from 0.0..=1.0 channel floats, as returned by Figma.
    pub fn from_unit_floats(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: unit_to_byte(r),
            g: unit_to_byte(g),
            b: unit_to_byte(b),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    fn unit(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    pub fn to_cmyk(self) -> Cmyk {
        let (r, g, b) = self.unit();
        let k = 1.0 - r.max(g).max(b);
        if k >= 1.0 {
            return Cmyk {
                c: 0,
                m: 0,
                y: 0,
                k: 100,
            };
        }
        Cmyk {
            c: to_percent((1.0 - r - k) / (1.0 - k)),
            m: to_percent((1.0 - g - k) / (1.0 - k)),
            y: to_percent((1.0 - b - k) / (1.0 - k)),
            k: to_percent(k),
        }
    }

    pub fn to_hsl(self) -> Hsl {
        let (r, g, b) = self.unit();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let delta = max - min;

        if delta == 0.0 {
            return Hsl {
                h: 0,
                s: 0,
                l: to_percent(l),
            };
        }

        let s = delta / (1.0 - (2.0 * l - 1.0).abs());
        let h = if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Hsl {
            h: (h.round() as u16) % 360,
            s: to_percent(s),
            l: to_percent(l),
        }
    }

    /// Perceived brightness, used to pick readable swatch text.
    pub fn is_light(self) -> bool {
        let luminance = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        luminance > 186.0
    }
}

/// Palette group a color belongs to; also the display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColorType {
    #[default]
    Brand,
    Neutral,
    Interactive,
}

impl ColorType {
    pub fn label(self) -> &'static str {
        match self {
            ColorType::Brand => "Brand Colors",
            ColorType::Neutral => "Neutral Colors",
            ColorType::Interactive => "Interactive Colors",
        }
    }
}

/// Payload stored in `BrandAsset::data` for color assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColorData {
    pub name: String,
    pub hex: String,
    pub rgb: Rgb,
    pub cmyk: Cmyk,
    pub hsl: Hsl,
    #[serde(default)]
    pub color_type: ColorType,
}

impl ColorData {
    pub fn from_rgb(name: &str, rgb: Rgb, color_type: ColorType) -> Self {
        Self {
            name: name.trim().to_string(),
            hex: rgb.to_hex(),
            rgb,
            cmyk: rgb.to_cmyk(),
            hsl: rgb.to_hsl(),
            color_type,
        }
    }

    pub fn from_hex(name: &str, hex: &str, color_type: ColorType) -> Result<Self, AppError> {
        Ok(Self::from_rgb(name, parse_hex(hex)?, color_type))
    }

    /// Read color data back from an asset's JSON payload. Older rows may only
    /// carry a `hex` field; the other representations are recomputed then.
    pub fn from_asset_data(name: &str, data: &serde_json::Value) -> Option<Self> {
        if let Ok(color) = serde_json::from_value::<ColorData>(data.clone()) {
            return Some(color);
        }
        let hex = data.get("hex")?.as_str()?;
        let color_type = data
            .get("color_type")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        ColorData::from_hex(name, hex, color_type).ok()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateColorRequest {
    #[validate(length(min = 1, max = 255, message = "Color name must be between 1 and 255 characters"))]
    pub name: String,
    pub hex: String,
    #[serde(default)]
    pub color_type: ColorType,
    #[serde(default)]
    pub visibility: Visibility,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(parse_hex("#FF8800").unwrap(), Rgb::new(255, 136, 0));
        assert_eq!(parse_hex("f80").unwrap(), Rgb::new(255, 136, 0));
        assert_eq!(parse_hex(" #0a0B0c ").unwrap(), Rgb::new(10, 11, 12));
    }

    #[test]
    fn rejects_invalid_hex() {
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("").is_err());
    }

    #[test]
    fn hex_formatting_is_uppercase() {
        assert_eq!(Rgb::new(10, 171, 255).to_hex(), "#0AABFF");
    }

    #[test]
    fn cmyk_conversion() {
        assert_eq!(Rgb::new(0, 0, 0).to_cmyk(), Cmyk { c: 0, m: 0, y: 0, k: 100 });
        assert_eq!(Rgb::new(255, 0, 0).to_cmyk(), Cmyk { c: 0, m: 100, y: 100, k: 0 });
        assert_eq!(Rgb::new(255, 255, 255).to_cmyk(), Cmyk { c: 0, m: 0, y: 0, k: 0 });
    }

    #[test]
    fn hsl_conversion() {
        assert_eq!(Rgb::new(255, 0, 0).to_hsl(), Hsl { h: 0, s: 100, l: 50 });
        assert_eq!(Rgb::new(0, 0, 255).to_hsl(), Hsl { h: 240, s: 100, l: 50 });
        assert_eq!(Rgb::new(128, 128, 128).to_hsl(), Hsl { h: 0, s: 0, l: 50 });
    }

    #[test]
    fn figma_floats_round() {
        assert_eq!(Rgb::from_unit_floats(1.0, 0.5, 0.0), Rgb::new(255, 128, 0));
        assert_eq!(Rgb::from_unit_floats(1.2, -0.1, 0.2), Rgb::new(255, 0, 51));
    }

    #[test]
    fn color_data_from_legacy_payload() {
        let data = serde_json::json!({ "hex": "#112233", "color_type": "neutral" });
        let color = ColorData::from_asset_data("Ink", &data).unwrap();
        assert_eq!(color.rgb, Rgb::new(0x11, 0x22, 0x33));
        assert_eq!(color.color_type, ColorType::Neutral);
        assert_eq!(color.name, "Ink");
    }

    #[test]
    fn color_data_round_trips_through_json() {
        let color = ColorData::from_hex("Sky", "#87CEEB", ColorType::Interactive).unwrap();
        let back = ColorData::from_asset_data("Sky", &color.to_json()).unwrap();
        assert_eq!(back, color);
    }
}
