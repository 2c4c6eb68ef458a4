// ============================================================================
// Palettes — defaults, presets, and palette-file import
// ============================================================================

use regex::Regex;

/// Starting palette for new projects.
pub const DEFAULT_PALETTE: &[&str] = &[
    "#000000", "#1a1c2c", "#5d275d", "#b13e53", "#ef7d57",
    "#ffcd75", "#a7f070", "#38b764", "#257179", "#29366f",
    "#3b5dc9", "#41a6f6", "#73eff7", "#f4f4f4", "#94b0c2",
    "#566c86", "#333c57", "#ffffff", "#9badb7",
];

/// A named, fixed palette preset.
pub struct PalettePreset {
    pub name: &'static str,
    pub colors: &'static [&'static str],
}

pub const PALETTE_PRESETS: &[PalettePreset] = &[
    PalettePreset {
        name: "Pico-8",
        colors: &[
            "#000000", "#1D2B53", "#7E2553", "#008751", "#AB5236", "#5F574F",
            "#C2C3C7", "#FFF1E8", "#FF004D", "#FFA300", "#FFEC27", "#00E436",
            "#29ADFF", "#83769C", "#FF77A8", "#FFCCAA",
        ],
    },
    PalettePreset {
        name: "Gameboy",
        colors: &["#0f380f", "#306230", "#8bac0f", "#9bbc0f"],
    },
    PalettePreset {
        name: "CGA",
        colors: &[
            "#000000", "#555555", "#FFFFFF", "#AA0000", "#FF5555", "#AA5500",
            "#FFFF55", "#00AA00", "#55FF55", "#00AAAA", "#55FFFF", "#0000AA",
            "#5555FF", "#AA00AA", "#FF55FF",
        ],
    },
    PalettePreset {
        name: "Commodore 64",
        colors: &[
            "#000000", "#FFFFFF", "#880000", "#AAFFEE", "#CC44CC", "#00CC55",
            "#0000AA", "#EEEE77", "#DD8855", "#664400", "#FF7777", "#333333",
            "#777777", "#AAFF66", "#0088FF", "#BBBBBB",
        ],
    },
];

/// Scan arbitrary text (`.hex`, `.txt`, `.pal`, `.gpl`, …) for hex color
/// tokens and build a palette from them.
///
/// Accepts `#rgb`, `#rrggbb`, and bare 6-digit tokens. All matches are
/// normalized to a leading-`#` 6-digit form (short form doubles each
/// digit); original digit case is preserved. Duplicates are removed
/// keeping first-seen order. Zero matches is an error.
pub fn parse_palette_text(content: &str) -> Result<Vec<String>, String> {
    // The '#' form allows 3 or 6 digits; the bare form requires all 6.
    let pattern = Regex::new(r"#([0-9a-fA-F]{3}){1,2}\b|[0-9a-fA-F]{6}\b")
        .map_err(|e| e.to_string())?;

    let mut colors: Vec<String> = Vec::new();
    for m in pattern.find_iter(content) {
        let token = m.as_str();
        let digits = token.strip_prefix('#').unwrap_or(token);
        let normalized = if digits.len() == 3 {
            let mut s = String::with_capacity(7);
            s.push('#');
            for c in digits.chars() {
                s.push(c);
                s.push(c);
            }
            s
        } else {
            format!("#{}", digits)
        };
        if !colors.contains(&normalized) {
            colors.push(normalized);
        }
    }

    if colors.is_empty() {
        return Err("No valid hex codes found in file.".to_string());
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgb;

    #[test]
    fn import_normalizes_and_dedupes() {
        let palette = parse_palette_text("Colors: #FF0000, 00ff00, #abc").unwrap();
        assert_eq!(palette, vec!["#FF0000", "#00ff00", "#aabbcc"]);
    }

    #[test]
    fn import_preserves_first_seen_order() {
        let palette = parse_palette_text("#112233 #445566 #112233").unwrap();
        assert_eq!(palette, vec!["#112233", "#445566"]);
    }

    #[test]
    fn import_with_no_matches_is_an_error() {
        let err = parse_palette_text("nothing here").unwrap_err();
        assert_eq!(err, "No valid hex codes found in file.");
    }

    #[test]
    fn default_palette_and_presets_parse() {
        for hex in DEFAULT_PALETTE {
            assert!(Rgb::parse(hex).is_some(), "bad default color {}", hex);
        }
        for preset in PALETTE_PRESETS {
            assert!(!preset.colors.is_empty());
            for hex in preset.colors {
                assert!(Rgb::parse(hex).is_some(), "bad {} color {}", preset.name, hex);
            }
        }
    }

    #[test]
    fn gameboy_preset_has_four_shades() {
        let gb = PALETTE_PRESETS.iter().find(|p| p.name == "Gameboy").unwrap();
        assert_eq!(gb.colors.len(), 4);
    }
}
