//! Display preferences shared by both sides: the closed font set and the
//! ordered size set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selectable pixel sizes, smallest first.
pub const SIZES: [u32; 7] = [12, 14, 16, 18, 20, 22, 24];

pub const DEFAULT_SIZE: Size = Size(16);

/// Body font. Unknown names coming from disk or the wire collapse to
/// [`FontId::System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontId {
    #[default]
    System,
    Inter,
    Serif,
    Sans,
    Mono,
    Readable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown font '{0}' (expected one of: system, inter, serif, sans, mono, readable)")]
pub struct UnknownFont(pub String);

impl FontId {
    pub const ALL: [FontId; 6] = [
        FontId::System,
        FontId::Inter,
        FontId::Serif,
        FontId::Sans,
        FontId::Mono,
        FontId::Readable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontId::System => "system",
            FontId::Inter => "inter",
            FontId::Serif => "serif",
            FontId::Sans => "sans",
            FontId::Mono => "mono",
            FontId::Readable => "readable",
        }
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            FontId::System => "System Default",
            FontId::Inter => "Inter",
            FontId::Serif => "Serif",
            FontId::Sans => "Sans-serif",
            FontId::Mono => "Monospace",
            FontId::Readable => "Readable",
        }
    }

    /// CSS `font-family` value applied to the document body.
    pub fn css_stack(&self) -> &'static str {
        match self {
            FontId::System => {
                "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Helvetica, Arial, sans-serif"
            }
            FontId::Inter => "Inter, -apple-system, BlinkMacSystemFont, sans-serif",
            FontId::Serif => "\"Iowan Old Style\", Georgia, \"Times New Roman\", serif",
            FontId::Sans => "\"Helvetica Neue\", Helvetica, Arial, sans-serif",
            FontId::Mono => "\"SF Mono\", Menlo, Consolas, \"Liberation Mono\", monospace",
            FontId::Readable => "Charter, \"Bitstream Charter\", \"Sitka Text\", Cambria, serif",
        }
    }

    /// Lenient parse used for persisted and IPC values.
    pub fn from_str_lossy(s: &str) -> FontId {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for FontId {
    type Err = UnknownFont;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        FontId::ALL
            .into_iter()
            .find(|font| font.as_str() == name)
            .ok_or_else(|| UnknownFont(s.to_string()))
    }
}

impl From<String> for FontId {
    fn from(value: String) -> Self {
        FontId::from_str_lossy(&value)
    }
}

impl From<FontId> for String {
    fn from(value: FontId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Larger,
    Smaller,
}

/// Body text size in CSS pixels.
///
/// A `Size` may hold a value outside [`SIZES`] (an old or hand-edited
/// settings file); stepping snaps it onto the set first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(u32);

impl Size {
    pub const MIN: Size = Size(SIZES[0]);
    pub const MAX: Size = Size(SIZES[SIZES.len() - 1]);

    pub const fn new(px: u32) -> Self {
        Self(px)
    }

    pub fn px(&self) -> u32 {
        self.0
    }

    pub fn is_standard(&self) -> bool {
        SIZES.contains(&self.0)
    }

    /// Nearest member of the size set; ties go to the smaller size.
    pub fn snap(self) -> Size {
        let nearest = SIZES
            .iter()
            .copied()
            .min_by_key(|candidate| candidate.abs_diff(self.0))
            .unwrap_or(DEFAULT_SIZE.0);
        Size(nearest)
    }

    /// One step through the size set, clamped at both ends.
    pub fn step(self, step: Step) -> Size {
        let snapped = self.snap();
        let index = SIZES.iter().position(|s| *s == snapped.0).unwrap_or(0);
        let next = match step {
            Step::Larger => (index + 1).min(SIZES.len() - 1),
            Step::Smaller => index.saturating_sub(1),
        };
        Size(SIZES[next])
    }

    pub fn all() -> impl Iterator<Item = Size> {
        SIZES.into_iter().map(Size)
    }
}

impl Default for Size {
    fn default() -> Self {
        DEFAULT_SIZE
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_parse_is_case_insensitive() {
        assert_eq!("Serif".parse::<FontId>(), Ok(FontId::Serif));
        assert_eq!(" mono ".parse::<FontId>(), Ok(FontId::Mono));
        assert!("comic".parse::<FontId>().is_err());
    }

    #[test]
    fn test_unknown_font_falls_back_to_system() {
        assert_eq!(FontId::from_str_lossy("wingdings"), FontId::System);
        let font: FontId = serde_json::from_str("\"papyrus\"").expect("deserialize");
        assert_eq!(font, FontId::System);
    }

    #[test]
    fn test_font_serializes_as_lowercase_name() {
        let json = serde_json::to_string(&FontId::Readable).expect("serialize");
        assert_eq!(json, "\"readable\"");
    }

    #[test]
    fn test_step_clamps_at_bounds() {
        assert_eq!(Size::MIN.step(Step::Smaller), Size::MIN);
        assert_eq!(Size::MAX.step(Step::Larger), Size::MAX);
        assert_eq!(Size::new(16).step(Step::Larger), Size::new(18));
        assert_eq!(Size::new(16).step(Step::Smaller), Size::new(14));
    }

    #[test]
    fn test_out_of_set_value_snaps_before_stepping() {
        assert_eq!(Size::new(17).snap(), Size::new(16));
        assert_eq!(Size::new(17).step(Step::Larger), Size::new(18));
        assert_eq!(Size::new(3).step(Step::Smaller), Size::MIN);
        assert_eq!(Size::new(400).step(Step::Larger), Size::MAX);
        assert_eq!(Size::new(400).step(Step::Smaller), Size::new(22));
    }

    #[test]
    fn test_repeated_stepping_converges_within_set_len() {
        for start in [0, 12, 13, 16, 19, 24, 99] {
            let mut size = Size::new(start);
            for _ in 0..SIZES.len() - 1 {
                size = size.step(Step::Larger);
            }
            assert_eq!(size, Size::MAX, "larger from {start}");

            let mut size = Size::new(start);
            for _ in 0..SIZES.len() - 1 {
                size = size.step(Step::Smaller);
            }
            assert_eq!(size, Size::MIN, "smaller from {start}");
        }
    }
}
