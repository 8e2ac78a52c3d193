use std::collections::BTreeMap;

use brandkit_core::colors::{ColorData, ColorType};
use serde::Serialize;
use serde_json::{json, Value};

/// Slack rejects messages with more than 50 blocks
pub const MAX_BLOCKS: usize = 50;

/// Slash-command response body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlackMessage {
    pub response_type: &'static str,
    pub text: String,
    pub blocks: Vec<Value>,
}

impl SlackMessage {
    pub fn ephemeral(text: impl Into<String>, blocks: Vec<Value>) -> Self {
        Self {
            response_type: "ephemeral",
            text: text.into(),
            blocks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let blocks = vec![mrkdwn_section(&text)];
        Self::ephemeral(text, blocks)
    }
}

/// A logo ready to display: name plus a URL Slack can fetch
#[derive(Debug, Clone)]
pub struct LogoLink {
    pub name: String,
    pub url: String,
}

fn mrkdwn_section(text: &str) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn header(text: &str) -> Value {
    json!({ "type": "header", "text": { "type": "plain_text", "text": text, "emoji": true } })
}

fn color_section(color: &ColorData, swatch_base_url: &str) -> Value {
    let rgb = color.rgb;
    let cmyk = color.cmyk;
    let text = format!(
        "*{}*\n`{}` · RGB {}, {}, {} · CMYK {}, {}, {}, {}",
        color.name, color.hex, rgb.r, rgb.g, rgb.b, cmyk.c, cmyk.m, cmyk.y, cmyk.k
    );
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
        "accessory": {
            "type": "image",
            "image_url": format!(
                "{}/{}",
                swatch_base_url.trim_end_matches('/'),
                color.hex.trim_start_matches('#')
            ),
            "alt_text": format!("{} swatch", color.name),
        }
    })
}

/// Block Kit palette for a client, grouped by color type in display order.
///
/// Output beyond [`MAX_BLOCKS`] is cut and replaced by a context block that
/// says how many colors were left out.
pub fn format_color_blocks(
    client_name: &str,
    colors: &[ColorData],
    swatch_base_url: &str,
) -> Vec<Value> {
    if colors.is_empty() {
        return vec![mrkdwn_section(&format!(
            "No colors have been added for *{}* yet.",
            client_name
        ))];
    }

    let mut groups: BTreeMap<ColorType, Vec<&ColorData>> = BTreeMap::new();
    for color in colors {
        groups.entry(color.color_type).or_default().push(color);
    }

    // (block, is a color row)
    let mut rows: Vec<(Value, bool)> = vec![(header(&format!("{} Colors", client_name)), false)];
    for (index, (color_type, group)) in groups.iter().enumerate() {
        if index > 0 {
            rows.push((json!({ "type": "divider" }), false));
        }
        rows.push((
            json!({
                "type": "context",
                "elements": [{ "type": "mrkdwn", "text": format!("*{}*", color_type.label()) }]
            }),
            false,
        ));
        for color in group {
            rows.push((color_section(color, swatch_base_url), true));
        }
    }

    if rows.len() <= MAX_BLOCKS {
        return rows.into_iter().map(|(block, _)| block).collect();
    }

    let omitted = rows[MAX_BLOCKS - 1..].iter().filter(|(_, c)| *c).count();
    let mut blocks: Vec<Value> = rows
        .into_iter()
        .take(MAX_BLOCKS - 1)
        .map(|(block, _)| block)
        .collect();
    blocks.push(json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": format!("…and {} more colors not shown", omitted)
        }]
    }));
    blocks
}

pub fn format_logo_blocks(client_name: &str, logos: &[LogoLink]) -> Vec<Value> {
    if logos.is_empty() {
        return vec![mrkdwn_section(&format!(
            "No logos have been added for *{}* yet.",
            client_name
        ))];
    }

    let mut blocks = vec![header(&format!("{} Logos", client_name))];
    for logo in logos.iter().take(MAX_BLOCKS - 1) {
        blocks.push(json!({
            "type": "image",
            "title": { "type": "plain_text", "text": logo.name },
            "image_url": logo.url,
            "alt_text": logo.name,
        }));
    }
    blocks
}

/// `fonts` pairs a font name with the formats it is available in
pub fn format_font_blocks(client_name: &str, fonts: &[(String, Vec<String>)]) -> Vec<Value> {
    if fonts.is_empty() {
        return vec![mrkdwn_section(&format!(
            "No fonts have been added for *{}* yet.",
            client_name
        ))];
    }

    let mut blocks = vec![header(&format!("{} Typography", client_name))];
    for (name, formats) in fonts.iter().take(MAX_BLOCKS - 1) {
        let formats = if formats.is_empty() {
            String::new()
        } else {
            format!("\n{}", formats.join(" · ").to_uppercase())
        };
        blocks.push(mrkdwn_section(&format!("*{}*{}", name, formats)));
    }
    blocks
}

pub fn format_help_blocks(command: &str) -> Vec<Value> {
    let command = if command.is_empty() { "/brand" } else { command };
    vec![
        header("Brand assets"),
        mrkdwn_section(&format!(
            "`{cmd} colors` show the color palette\n`{cmd} logo [name]` show logos\n`{cmd} fonts` list typography\n`{cmd} help` show this message",
            cmd = command
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(name: &str, hex: &str, color_type: ColorType) -> ColorData {
        ColorData::from_hex(name, hex, color_type).unwrap()
    }

    fn types(blocks: &[Value]) -> Vec<&str> {
        blocks.iter().map(|b| b["type"].as_str().unwrap()).collect()
    }

    #[test]
    fn empty_palette_is_a_single_section() {
        let blocks = format_color_blocks("Acme", &[], "https://x/swatch");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["type"], "section");
        assert!(blocks[0]["text"]["text"].as_str().unwrap().contains("No colors"));
    }

    #[test]
    fn groups_follow_color_type_order() {
        let colors = vec![
            color("Link", "#0055FF", ColorType::Interactive),
            color("Ink", "#111111", ColorType::Neutral),
            color("Red", "#FF0000", ColorType::Brand),
        ];
        let blocks = format_color_blocks("Acme", &colors, "https://x/swatch/");

        assert_eq!(
            types(&blocks),
            vec![
                "header", "context", "section", "divider", "context", "section", "divider",
                "context", "section"
            ]
        );
        assert_eq!(blocks[1]["elements"][0]["text"], "*Brand Colors*");
        assert_eq!(blocks[4]["elements"][0]["text"], "*Neutral Colors*");
        assert_eq!(blocks[7]["elements"][0]["text"], "*Interactive Colors*");
    }

    #[test]
    fn color_section_shows_hex_rgb_cmyk_and_swatch() {
        let blocks = format_color_blocks(
            "Acme",
            &[color("Red", "#ff0000", ColorType::Brand)],
            "https://x/swatch/",
        );
        let section = &blocks[2];
        assert_eq!(
            section["text"]["text"],
            "*Red*\n`#FF0000` · RGB 255, 0, 0 · CMYK 0, 100, 100, 0"
        );
        assert_eq!(section["accessory"]["image_url"], "https://x/swatch/FF0000");
    }

    #[test]
    fn truncates_at_block_limit() {
        let colors: Vec<ColorData> = (0..60)
            .map(|i| color(&format!("C{}", i), "#123456", ColorType::Brand))
            .collect();
        let blocks = format_color_blocks("Acme", &colors, "https://x");

        assert_eq!(blocks.len(), MAX_BLOCKS);
        // header + group context + 47 colors shown
        let last = blocks.last().unwrap();
        assert_eq!(last["type"], "context");
        assert_eq!(last["elements"][0]["text"], "…and 13 more colors not shown");
    }

    #[test]
    fn message_is_ephemeral() {
        let message = SlackMessage::plain("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["response_type"], "ephemeral");
        assert_eq!(value["blocks"][0]["text"]["text"], "hi");
    }
}
