use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{random::zero_pad, MandalaError, RandomSource, Result};

/// 8-bit RGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue, saturation and brightness, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsb {
    pub h: f64,
    pub s: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random(rng: &mut RandomSource) -> Self {
        Self::new(rng.channel(), rng.channel(), rng.channel())
    }

    /// Parses a `#rrggbb` string. Case-insensitive.
    pub fn parse_hex(value: &str) -> Result<Self> {
        let invalid = || MandalaError::InvalidColorFormat(value.to_string());
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        let mut hex = String::with_capacity(7);
        hex.push('#');
        for channel in [self.r, self.g, self.b] {
            hex.push_str(&zero_pad(&format!("{channel:x}"), 2));
        }
        hex
    }

    pub fn to_hsb(self) -> Hsb {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        let max = r.max(g).max(b);
        let chroma = max - r.min(g).min(b);

        let hue_sector = if chroma == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / chroma).rem_euclid(6.0)
        } else if max == g {
            (b - r) / chroma + 2.0
        } else {
            (r - g) / chroma + 4.0
        };

        Hsb {
            h: hue_sector / 6.0,
            s: if chroma == 0.0 { 0.0 } else { chroma / max },
            b: max,
        }
    }

    /// The colour with its hue rotated by half a turn.
    pub fn contrasting(self) -> Self {
        let hsb = self.to_hsb();
        Hsb {
            h: (hsb.h + 0.5).rem_euclid(1.0),
            ..hsb
        }
        .to_rgb()
    }

    /// Per-channel linear blend towards `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl Hsb {
    pub fn to_rgb(self) -> Rgb {
        let h = self.h.rem_euclid(1.0) * 6.0;
        let s = self.s.clamp(0.0, 1.0);
        let v = self.b.clamp(0.0, 1.0);
        let chroma = v * s;
        let x = chroma * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
        let (r, g, b) = match h.floor() as u8 % 6 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let offset = v - chroma;
        let to_byte = |c: f64| ((c + offset) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb::new(to_byte(r), to_byte(g), to_byte(b))
    }
}

/// Hue-rotated complement of a `#rrggbb` string, in the same format.
pub fn contrasting_colour(colour: &str) -> Result<String> {
    Ok(Rgb::parse_hex(colour)?.contrasting().to_hex())
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = MandalaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = MandalaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Fill paint of a curve: either nothing or a solid colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    None,
    Solid(Rgb),
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fill::None => f.write_str("none"),
            Fill::Solid(colour) => colour.fmt(f),
        }
    }
}
