//! Text normalization before synthesis

const EXPANSIONS: &[(&str, &str)] = &[
    ("Dr.", "Doctor"),
    ("Mr.", "Mister"),
    ("Mrs.", "Missus"),
    ("Ms.", "Miss"),
];

/// Strip markdown emphasis and headings, expand honorifics, trim.
pub fn optimize_for_speech(text: &str) -> String {
    let mut spoken = text.replace("**", "").replace(|c: char| c == '*' || c == '#', "");
    for (abbreviation, expansion) in EXPANSIONS {
        spoken = spoken.replace(abbreviation, expansion);
    }
    spoken.trim().to_string()
}
