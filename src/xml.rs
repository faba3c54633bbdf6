//! Child-element text helpers shared by the runtime config and scene manifest parsers.

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::Node;

use crate::object::Color;

pub(crate) fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

pub(crate) fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub(crate) fn has_child(node: &Node<'_, '_>, tag: &str) -> bool {
    node.children().any(|child| child.has_tag_name(tag))
}

/// Three numbers separated by whitespace or commas.
pub(crate) fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|component| !component.is_empty())
        .map(|component| {
            component
                .parse::<f32>()
                .with_context(|| format!("invalid vector component `{component}`"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(anyhow!("expected 3 vector components in `{value}`")),
    }
}

pub(crate) fn parse_color(value: Option<String>, default: Color) -> Result<Color> {
    match value {
        Some(value) => Color::from_hex(&value).ok_or_else(|| anyhow!("invalid colour `{value}`")),
        None => Ok(default),
    }
}

pub(crate) fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

pub(crate) fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer `{value}`: {err}")),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "yes" | "on" | "1") => Ok(true),
        Some("false" | "no" | "off" | "0") => Ok(false),
        Some(other) => Err(anyhow!("failed to parse boolean `{other}`")),
    }
}
