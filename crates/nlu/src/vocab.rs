//! Domain vocabulary tables
//!
//! Measurement names, ocean basins, named regions, and quality terms used by
//! the vocabulary extraction layer, plus the stop-word lists the language
//! detector leans on.

/// Measurement surface forms mapped to canonical names
pub const MEASUREMENTS: &[(&str, &str)] = &[
    ("temperature", "temperature"),
    ("temp", "temperature"),
    ("sea surface temperature", "temperature"),
    ("sst", "temperature"),
    ("thermal structure", "temperature"),
    ("salinity", "salinity"),
    ("psal", "salinity"),
    ("salt content", "salinity"),
    ("practical salinity", "salinity"),
    ("pressure", "pressure"),
    ("depth", "pressure"),
    ("oxygen", "oxygen"),
    ("dissolved oxygen", "oxygen"),
    ("doxy", "oxygen"),
    ("chlorophyll", "chlorophyll"),
    ("chla", "chlorophyll"),
    ("nitrate", "nitrate"),
    ("ph", "ph"),
];

/// Ocean basins
pub const OCEAN_BASINS: &[&str] = &[
    "atlantic ocean",
    "pacific ocean",
    "indian ocean",
    "arctic ocean",
    "southern ocean",
    "atlantic",
    "pacific",
];

/// Named seas and regions
pub const NAMED_REGIONS: &[&str] = &[
    "arabian sea",
    "bay of bengal",
    "andaman sea",
    "south china sea",
    "mediterranean sea",
    "red sea",
    "caribbean sea",
    "gulf of mexico",
    "gulf of oman",
    "coral sea",
    "tasman sea",
    "labrador sea",
    "sargasso sea",
    "equatorial indian ocean",
    "equator",
];

/// Quality requirement terms
pub const QUALITY_TERMS: &[&str] = &[
    "good quality",
    "quality controlled",
    "qc passed",
    "adjusted",
    "delayed mode",
    "delayed-mode",
    "real time",
    "real-time",
    "realtime",
];

/// English stop words (extraction filter + language detection)
pub const STOP_WORDS_EN: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "in", "on", "at", "to", "for",
    "of", "with", "by", "from", "and", "or", "but", "not", "this", "that", "these", "those",
    "it", "its", "as", "do", "does", "did", "has", "have", "had", "can", "could", "will",
    "would", "should", "may", "might", "what", "which", "where", "when", "how", "me", "show",
];

/// Spanish stop words (language detection only)
pub const STOP_WORDS_ES: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "de", "del", "en", "y", "o", "que", "es", "son",
    "fue", "por", "para", "con", "como", "donde", "cuando", "cual", "muestra",
];

/// French stop words (language detection only)
pub const STOP_WORDS_FR: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "de", "du", "en", "et", "ou", "que", "est", "sont",
    "par", "pour", "avec", "dans", "comment", "quelle", "quand",
];

/// Canonical measurement for a surface form, longest match wins at call sites
pub fn measurement_for(surface: &str) -> Option<&'static str> {
    let lower = surface.to_lowercase();
    MEASUREMENTS
        .iter()
        .find(|(form, _)| *form == lower)
        .map(|(_, canonical)| *canonical)
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS_EN.contains(&word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_lookup() {
        assert_eq!(measurement_for("SST"), Some("temperature"));
        assert_eq!(measurement_for("psal"), Some("salinity"));
        assert_eq!(measurement_for("unknown thing"), None);
    }

    #[test]
    fn test_stop_words() {
        assert!(is_stop_word("The"));
        assert!(!is_stop_word("salinity"));
    }
}
