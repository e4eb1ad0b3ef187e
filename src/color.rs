//! Colour values used by block styles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Simple RGB colour independent of any UI toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Parse a colour given as `#rrggbb`, `#rgb`, `[r, g, b]` (0..1 floats or
/// 0..255 integers) or a CSS-style name.
pub fn parse_color(val: &str) -> Option<Rgb> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        return match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb(r, g, b))
            }
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Rgb(it.next()??, it.next()??, it.next()??))
            }
            _ => None,
        };
    }
    if val.starts_with('[') && val.ends_with(']') {
        let inner = &val[1..val.len() - 1];
        let parts: Vec<f32> = inner
            .split(',')
            .map(|s| s.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;
        if parts.len() != 3 {
            return None;
        }
        let unit = parts.iter().all(|p| *p <= 1.0);
        let to_u8 = |p: f32| {
            let v = if unit { p * 255.0 } else { p };
            v.round().clamp(0.0, 255.0) as u8
        };
        return Some(Rgb(to_u8(parts[0]), to_u8(parts[1]), to_u8(parts[2])));
    }
    let named = match val.to_ascii_lowercase().as_str() {
        "white" => Rgb(0xff, 0xff, 0xff),
        "black" => Rgb(0x00, 0x00, 0x00),
        "red" => Rgb(0xff, 0x00, 0x00),
        "green" => Rgb(0x00, 0x80, 0x00),
        "blue" => Rgb(0x00, 0x00, 0xff),
        "yellow" => Rgb(0xff, 0xff, 0x00),
        "orange" => Rgb(0xff, 0xa5, 0x00),
        "cyan" => Rgb(0x00, 0xff, 0xff),
        "magenta" => Rgb(0xff, 0x00, 0xff),
        "lightblue" => Rgb(0xad, 0xd8, 0xe6),
        "darkgreen" => Rgb(0x00, 0x64, 0x00),
        "gray" | "grey" => Rgb(0x80, 0x80, 0x80),
        "lightgray" | "lightgrey" => Rgb(0xd3, 0xd3, 0xd3),
        "purple" => Rgb(0x80, 0x00, 0x80),
        "pink" => Rgb(0xff, 0xc0, 0xcb),
        "teal" => Rgb(0x00, 0x80, 0x80),
        "navy" => Rgb(0x00, 0x00, 0x80),
        _ => return None,
    };
    Some(named)
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_color(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid colour '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        assert_eq!(parse_color("#3b82f6"), Some(Rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(parse_color("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(parse_color("[1.0, 0.5, 0]"), Some(Rgb(255, 128, 0)));
        assert_eq!(parse_color("[10, 20, 30]"), Some(Rgb(10, 20, 30)));
        assert_eq!(parse_color(" Teal "), Some(Rgb(0, 128, 128)));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
        assert_eq!(parse_color("#aéxyz"), None);
        assert_eq!(parse_color("#éé"), None);
    }

    #[test]
    fn serde_as_hex_string() {
        let v = serde_json::to_value(Rgb(1, 2, 255)).unwrap();
        assert_eq!(v, "#0102ff");
        let back: Rgb = serde_json::from_value(v).unwrap();
        assert_eq!(back, Rgb(1, 2, 255));
        assert!(serde_json::from_str::<Rgb>("\"nope\"").is_err());
        assert!(serde_json::from_str::<Rgb>("\"#aéxyz\"").is_err());
    }
}
