use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec2;
use log::warn;
use serde::Deserialize;

use crate::error::LoadError;

/// Font in the typeface JSON layout: glyph outlines in font units plus the
/// metrics needed to lay out lines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[serde(default)]
    pub family_name: String,
    pub resolution: f32,
    pub bounding_box: FontBounds,
    #[serde(default)]
    pub underline_thickness: f32,
    pub glyphs: HashMap<String, Glyph>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Glyph {
    /// Horizontal advance.
    pub ha: f32,
    /// Outline commands: `m x y`, `l x y`, `q x y cx cy`, `b x y c1x c1y c2x c2y`.
    #[serde(default)]
    pub o: Option<String>,
}

impl Font {
    pub fn from_json(path: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let font: Font =
            serde_json::from_slice(bytes).map_err(|err| LoadError::decode_failed(path, err))?;
        if !(font.resolution > 0.0) {
            return Err(LoadError::decode_failed(
                path,
                format!("font resolution must be positive, got {}", font.resolution),
            ));
        }
        Ok(font)
    }

    fn glyph(&self, ch: char) -> Option<&Glyph> {
        let mut key = [0u8; 4];
        self.glyphs
            .get(&*ch.encode_utf8(&mut key))
            .or_else(|| self.glyphs.get("?"))
    }

    /// Distance between baselines at `size`.
    pub fn line_height(&self, size: f32) -> f32 {
        let bounds = self.bounding_box;
        (bounds.y_max - bounds.y_min + self.underline_thickness) * size / self.resolution
    }

    /// Lays `text` out at `size` and flattens every glyph outline into closed
    /// contours. Curves are split into `curve_segments` straight pieces.
    ///
    /// Characters without a glyph fall back to `?`; when the font has neither
    /// the character is skipped.
    pub fn contours(&self, text: &str, size: f32, curve_segments: u32) -> Result<Vec<Vec<Vec2>>> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let mut contours = Vec::new();
        let mut offset = Vec2::ZERO;

        for ch in text.chars() {
            if ch == '\n' {
                offset = Vec2::new(0.0, offset.y - line_height);
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                warn!("font {} has no glyph for {ch:?}", self.family_name);
                continue;
            };
            if let Some(outline) = glyph.o.as_deref() {
                let flattened = flatten_outline(outline, scale, offset, curve_segments.max(1))
                    .with_context(|| format!("glyph {ch:?}"))?;
                contours.extend(flattened);
            }
            offset.x += glyph.ha * scale;
        }
        Ok(contours)
    }
}

fn flatten_outline(
    outline: &str,
    scale: f32,
    offset: Vec2,
    segments: u32,
) -> Result<Vec<Vec<Vec2>>> {
    let mut tokens = outline.split_whitespace();
    let next_point = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<Vec2> {
        let mut coordinate = || -> Result<f32> {
            Ok(tokens
                .next()
                .ok_or_else(|| anyhow!("outline ends mid-command"))?
                .parse::<f32>()?)
        };
        Ok(Vec2::new(coordinate()?, coordinate()?) * scale + offset)
    };

    let mut contours: Vec<Vec<Vec2>> = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    while let Some(command) = tokens.next() {
        match command {
            "m" => {
                if current.len() > 1 {
                    contours.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                current.push(next_point(&mut tokens)?);
            }
            "l" => {
                let point = next_point(&mut tokens)?;
                current.push(point);
            }
            "q" => {
                let end = next_point(&mut tokens)?;
                let control = next_point(&mut tokens)?;
                let start = *current.last().ok_or_else(|| anyhow!("curve before move"))?;
                for step in 1..=segments {
                    let t = step as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(start * (u * u) + control * (2.0 * u * t) + end * (t * t));
                }
            }
            "b" => {
                let end = next_point(&mut tokens)?;
                let first = next_point(&mut tokens)?;
                let second = next_point(&mut tokens)?;
                let start = *current.last().ok_or_else(|| anyhow!("curve before move"))?;
                for step in 1..=segments {
                    let t = step as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(
                        start * (u * u * u)
                            + first * (3.0 * u * u * t)
                            + second * (3.0 * u * t * t)
                            + end * (t * t * t),
                    );
                }
            }
            other => bail!("unknown outline command `{other}`"),
        }
    }
    if current.len() > 1 {
        contours.push(current);
    }
    Ok(contours)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = r#"{
        "familyName": "Blocky",
        "resolution": 1000,
        "underlineThickness": 50,
        "boundingBox": {"xMin": 0, "xMax": 800, "yMin": -200, "yMax": 750},
        "glyphs": {
            "I": {"ha": 400, "x_min": 0, "x_max": 300, "o": "m 0 0 l 300 0 l 300 700 l 0 700 l 0 0"},
            "?": {"ha": 500, "o": "m 0 0 q 200 0 100 100"},
            " ": {"ha": 250}
        }
    }"#;

    fn font() -> Font {
        Font::from_json("blocky.typeface.json", FONT.as_bytes()).unwrap()
    }

    #[test]
    fn parses_typeface_metrics() {
        let font = font();
        assert_eq!(font.family_name, "Blocky");
        assert_eq!(font.glyphs.len(), 3);
        assert!((font.line_height(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn glyphs_advance_and_scale() {
        let contours = font().contours("I I", 1.0, 4).unwrap();
        assert_eq!(contours.len(), 2);
        assert!(contours[0][2].abs_diff_eq(Vec2::new(0.3, 0.7), 1e-6));
        // Second `I` starts after two advances: `I` then the space.
        assert!((contours[1][0].x - 0.65).abs() < 1e-6);
    }

    #[test]
    fn curves_are_flattened_and_unknown_glyphs_fall_back() {
        let contours = font().contours("Z", 2.0, 4).unwrap();
        assert_eq!(contours.len(), 1);
        let curve = &contours[0];
        assert_eq!(curve.len(), 5);
        assert_eq!(curve[0], Vec2::ZERO);
        assert!(curve[4].abs_diff_eq(Vec2::new(0.4, 0.0), 1e-6));
        assert!(curve[2].y > 0.0);
    }

    #[test]
    fn newlines_move_down_one_line() {
        let contours = font().contours("I\nI", 0.5, 4).unwrap();
        assert_eq!(contours[1][0], Vec2::new(0.0, -0.5));
    }

    #[test]
    fn rejects_broken_fonts() {
        assert!(matches!(
            Font::from_json("bad.json", b"{\"glyphs\": 3}"),
            Err(LoadError::Decode { .. })
        ));
        let zero = FONT.replace("\"resolution\": 1000", "\"resolution\": 0");
        assert!(Font::from_json("zero.json", zero.as_bytes()).is_err());

        let mut truncated = font();
        truncated.glyphs.insert(
            "T".into(),
            Glyph {
                ha: 100.0,
                o: Some("m 0 0 l 10".into()),
            },
        );
        assert!(truncated.contours("T", 1.0, 4).is_err());
    }
}
