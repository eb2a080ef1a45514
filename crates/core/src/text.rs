//! Text folding shared by name matching and chart-group classification.

/// Strip the diacritic from a lowercase Latin letter.
pub fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lowercase ASCII-folded key: runs of anything non-alphanumeric become a single `_`,
/// with none leading or trailing (`"Despesas  Financeiras"` → `despesas_financeiras`).
pub fn slug(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(fold_diacritic)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join("_")
}
