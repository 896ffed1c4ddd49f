//! Font substitution and style resolution
//!
//! The [`FontTable`] is an immutable value built once and shared read-only by
//! every page worker. Resolution is total: any input name, including garbage
//! and the `unknown` sentinel, resolves to a family from the table's known set.

use crate::error::{Error, Result};
use crate::model::{ResolvedFont, StyledRun, TextRun};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Keys shorter than this are only used for exact matches
const MIN_FRAGMENT_LEN: usize = 3;

/// Source font name keys (normalized) to target families
const DEFAULT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("arial", "Arial"),
    ("arialmt", "Arial"),
    ("helvetica", "Arial"),
    ("helveticaneue", "Arial"),
    ("liberationsans", "Arial"),
    ("nimbussans", "Arial"),
    ("roboto", "Arial"),
    ("dejavusans", "Verdana"),
    ("verdana", "Verdana"),
    ("tahoma", "Tahoma"),
    ("trebuchet", "Trebuchet MS"),
    ("trebuchetms", "Trebuchet MS"),
    ("segoeui", "Segoe UI"),
    ("calibri", "Calibri"),
    ("carlito", "Calibri"),
    ("opensans", "Calibri"),
    ("lato", "Calibri"),
    ("sourcesans", "Calibri"),
    ("times", "Times New Roman"),
    ("timesroman", "Times New Roman"),
    ("timesnewroman", "Times New Roman"),
    ("liberationserif", "Times New Roman"),
    ("nimbusroman", "Times New Roman"),
    ("dejavuserif", "Times New Roman"),
    ("cmr", "Times New Roman"),
    ("cambria", "Cambria"),
    ("caladea", "Cambria"),
    ("georgia", "Georgia"),
    ("garamond", "Georgia"),
    ("palatino", "Georgia"),
    ("bookantiqua", "Georgia"),
    ("courier", "Courier New"),
    ("couriernew", "Courier New"),
    ("liberationmono", "Courier New"),
    ("nimbusmono", "Courier New"),
    ("dejavusansmono", "Courier New"),
    ("consolas", "Consolas"),
    ("menlo", "Consolas"),
    ("symbol", "Symbol"),
    ("zapfdingbats", "Wingdings"),
    ("wingdings", "Wingdings"),
    ("unknown", "Calibri"),
];

const DEFAULT_KNOWN: &[&str] = &[
    "Arial",
    "Calibri",
    "Cambria",
    "Consolas",
    "Courier New",
    "Georgia",
    "Segoe UI",
    "Symbol",
    "Tahoma",
    "Times New Roman",
    "Trebuchet MS",
    "Verdana",
    "Wingdings",
];

const DEFAULT_FAMILY: &str = "Calibri";

/// Immutable font substitution table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FontTableSpec", into = "FontTableSpec")]
pub struct FontTable {
    known_families: BTreeSet<String>,
    substitutions: BTreeMap<String, String>,
    default_family: String,
    /// Keys usable for fragment matching, longest first
    fragments: Vec<String>,
}

/// Serialized form of a [`FontTable`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontTableSpec {
    pub known_families: Vec<String>,
    pub substitutions: BTreeMap<String, String>,
    pub default_family: String,
}

impl TryFrom<FontTableSpec> for FontTable {
    type Error = Error;

    fn try_from(spec: FontTableSpec) -> Result<Self> {
        FontTable::new(spec.known_families, spec.substitutions, spec.default_family)
    }
}

impl From<FontTable> for FontTableSpec {
    fn from(table: FontTable) -> Self {
        FontTableSpec {
            known_families: table.known_families.into_iter().collect(),
            substitutions: table.substitutions,
            default_family: table.default_family,
        }
    }
}

impl Default for FontTable {
    fn default() -> Self {
        let substitutions = DEFAULT_SUBSTITUTIONS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let known = DEFAULT_KNOWN.iter().map(|s| s.to_string()).collect();
        Self::build(known, substitutions, DEFAULT_FAMILY.to_string())
    }
}

impl FontTable {
    /// Build a table, checking that every target family is known
    pub fn new(
        known_families: impl IntoIterator<Item = String>,
        substitutions: BTreeMap<String, String>,
        default_family: String,
    ) -> Result<Self> {
        let known: BTreeSet<String> = known_families
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        if !known.contains(&default_family) {
            return Err(Error::InvalidFontTable {
                reason: format!(
                    "default family \"{}\" is not a known family",
                    default_family
                ),
            });
        }

        let mut normalized = BTreeMap::new();
        for (source, target) in substitutions {
            if !known.contains(&target) {
                return Err(Error::InvalidFontTable {
                    reason: format!("\"{}\" maps to unknown family \"{}\"", source, target),
                });
            }
            let key = normalize_font_name(&source);
            if key.is_empty() {
                return Err(Error::InvalidFontTable {
                    reason: format!("empty source font name \"{}\"", source),
                });
            }
            normalized.insert(key, target);
        }

        Ok(Self::build(known, normalized, default_family))
    }

    fn build(
        known_families: BTreeSet<String>,
        substitutions: BTreeMap<String, String>,
        default_family: String,
    ) -> Self {
        let mut fragments: Vec<String> = substitutions
            .keys()
            .filter(|k| k.len() >= MIN_FRAGMENT_LEN)
            .cloned()
            .collect();
        fragments.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            known_families,
            substitutions,
            default_family,
            fragments,
        }
    }

    /// Parse a table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    pub fn is_known(&self, family: &str) -> bool {
        self.known_families.contains(family)
    }

    /// Closest available family for a source font name
    pub fn family_for(&self, source_name: &str) -> &str {
        let key = normalize_font_name(source_name);
        if key.is_empty() {
            return &self.default_family;
        }

        if let Some(family) = self.substitutions.get(&key) {
            return family;
        }

        // "arial-boldmt" -> "arial", "timesnewroman,bold" -> "timesnewroman"
        let base = strip_style_suffix(&key);
        if let Some(family) = self.substitutions.get(base) {
            return family;
        }

        // Exact known family names pass through ("Segoe UI" -> "segoeui")
        if let Some(family) = self
            .known_families
            .iter()
            .find(|f| normalize_font_name(f) == base)
        {
            return family;
        }

        self.fragments
            .iter()
            .find(|fragment| base.contains(fragment.as_str()))
            .and_then(|fragment| self.substitutions.get(fragment))
            .unwrap_or(&self.default_family)
    }

    /// Resolve family and style for a source name plus explicit style flags.
    /// Either signal being bold (or italic) makes the result bold (or italic).
    pub fn resolve(&self, source_name: &str, bold: bool, italic: bool) -> ResolvedFont {
        let (name_bold, name_italic) = style_from_name(source_name);
        ResolvedFont {
            family: self.family_for(source_name).to_string(),
            bold: bold || name_bold,
            italic: italic || name_italic,
        }
    }

    /// Pair each run with its resolved font, keeping order
    pub fn map_runs(&self, runs: Vec<TextRun>) -> Vec<StyledRun> {
        runs.into_iter()
            .map(|run| {
                let font = self.resolve(&run.font_family, run.bold, run.italic);
                StyledRun { run, font }
            })
            .collect()
    }
}

/// Lowercase, drop whitespace and any subset tag (`ABCDEF+Name`)
pub fn normalize_font_name(name: &str) -> String {
    let name = match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    };
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn strip_style_suffix(key: &str) -> &str {
    let base = key.split(|c| c == '-' || c == ',').next().unwrap_or(key);
    let base = base.strip_suffix("mt").unwrap_or(base);
    let base = base.strip_suffix("ps").unwrap_or(base);
    if base.is_empty() {
        key
    } else {
        base
    }
}

/// Bold / italic hints carried in a font name
pub fn style_from_name(name: &str) -> (bool, bool) {
    let lower = name.to_lowercase();
    let bold = lower.contains("bold") || lower.contains("heavy");
    let italic = lower.contains("italic") || lower.contains("oblique");
    (bold, italic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNKNOWN_FONT;
    use rstest::rstest;

    #[rstest]
    #[case("Times-Roman", "Times New Roman")]
    #[case("TimesNewRomanPS-BoldMT", "Times New Roman")]
    #[case("ABCDEF+Times New Roman,Italic", "Times New Roman")]
    #[case("Helvetica-Bold", "Arial")]
    #[case("ArialMT", "Arial")]
    #[case("Arial-BoldItalicMT", "Arial")]
    #[case("CourierNewPSMT", "Courier New")]
    #[case("Courier-Oblique", "Courier New")]
    #[case("QWERTY+Calibri-Light", "Calibri")]
    #[case("Segoe UI", "Segoe UI")]
    #[case("LiberationSerif-Regular", "Times New Roman")]
    #[case("CMR10", "Times New Roman")]
    #[case("unknown", "Calibri")]
    #[case("", "Calibri")]
    #[case("Wingbats-Custom-Font", "Calibri")]
    fn test_family_substitution(#[case] source: &str, #[case] expected: &str) {
        let table = FontTable::default();
        assert_eq!(table.family_for(source), expected);
    }

    #[test]
    fn test_unknown_sentinel_resolves_to_default() {
        let table = FontTable::default();
        let font = table.resolve(UNKNOWN_FONT, false, false);
        assert_eq!(font.family, table.default_family());
    }

    #[test]
    fn test_style_flags_are_or_combined() {
        let table = FontTable::default();
        assert!(table.resolve("Helvetica-Bold", false, false).bold);
        assert!(table.resolve("Helvetica", true, false).bold);
        assert!(!table.resolve("Helvetica", false, false).bold);
        let font = table.resolve("Times-BoldItalic", false, false);
        assert!(font.bold && font.italic);
        assert!(table.resolve("Courier-Oblique", false, false).italic);
        assert!(table.resolve("Courier", false, true).italic);
    }

    #[test]
    fn test_mapping_is_total_over_garbage() {
        let table = FontTable::default();
        // xorshift, so the inputs are stable between runs
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..1000 {
            let len = (next() % 40) as usize;
            let name: String = (0..len)
                .filter_map(|_| char::from_u32((next() % 0x3000) as u32))
                .collect();
            let font = table.resolve(&name, false, false);
            assert!(!font.family.is_empty());
            assert!(table.is_known(&font.family), "{:?} -> {}", name, font.family);
        }
    }

    #[test]
    fn test_table_rejects_unknown_targets() {
        let mut subs = BTreeMap::new();
        subs.insert("Foo".to_string(), "Bar".to_string());
        let err = FontTable::new(vec!["Arial".to_string()], subs, "Arial".to_string());
        assert!(matches!(err, Err(Error::InvalidFontTable { .. })));

        let arial = vec!["Arial".to_string()];
        let err = FontTable::new(arial, BTreeMap::new(), "Comic".to_string());
        assert!(matches!(err, Err(Error::InvalidFontTable { .. })));
    }

    #[test]
    fn test_injected_table_is_used() {
        let json = r#"{
            "known_families": ["Noto Sans", "Noto Serif"],
            "substitutions": {"Times New Roman": "Noto Serif", "Helvetica": "Noto Sans"},
            "default_family": "Noto Sans"
        }"#;
        let table = FontTable::from_json(json).unwrap();
        assert_eq!(table.family_for("TimesNewRomanPS-BoldMT"), "Noto Serif");
        assert_eq!(table.family_for("Helvetica"), "Noto Sans");
        assert_eq!(table.family_for("Garamond"), "Noto Sans");
        let empty = r#"{"known_families": [], "substitutions": {}, "default_family": "X"}"#;
        assert!(FontTable::from_json(empty).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_behaviour() {
        let table = FontTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let back = FontTable::from_json(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_map_runs_preserves_order() {
        use crate::model::{Rect, Rgb};
        let run = |text: &str, font: &str| TextRun {
            layer_index: 0,
            text: text.to_string(),
            bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
            font_family: font.to_string(),
            font_size_pt: 10.0,
            bold: false,
            italic: false,
            color: Rgb::BLACK,
        };
        let runs = vec![run("a", "Courier"), run("b", "Times-Bold")];
        let styled = FontTable::default().map_runs(runs);
        assert_eq!(styled[0].run.text, "a");
        assert_eq!(styled[0].font.family, "Courier New");
        assert_eq!(styled[1].font.family, "Times New Roman");
        assert!(styled[1].font.bold);
    }
}
