//! Payee-name normalization and similarity.

use strsim::jaro_winkler;

use finops_core::text::fold_diacritic;

/// Corporate-form suffixes that carry no identity.
const CORPORATE_FORMS: [&str; 6] = ["ltda", "me", "sa", "eireli", "epp", "mei"];

/// Fuzzy token equality kicks in at this length and similarity.
const FUZZY_MIN_LEN: usize = 4;
const FUZZY_THRESHOLD: f64 = 0.92;

/// Partial matches never reach the score of an exact match.
const PARTIAL_SCALE: f64 = 0.9;

/// Lowercase, fold diacritics, split on anything non-alphanumeric and drop
/// corporate-form tokens.
pub fn normalize_tokens(name: &str) -> Vec<String> {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(fold_diacritic)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded
        .split_whitespace()
        .filter(|t| !CORPORATE_FORMS.contains(t))
        .map(str::to_string)
        .collect()
}

fn tokens_match(a: &str, b: &str) -> bool {
    a == b
        || (a.chars().count() >= FUZZY_MIN_LEN
            && b.chars().count() >= FUZZY_MIN_LEN
            && jaro_winkler(a, b) >= FUZZY_THRESHOLD)
}

fn is_contiguous_run(needle: &[String], haystack: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Similarity of two payee names in [0, 1].
///
/// 1.0 on exact normalized equality; otherwise the overlap coefficient of the
/// token sets scaled by 0.9; 0.0 when either side has no tokens.
pub fn payee_similarity(a: &str, b: &str) -> f64 {
    let ta = normalize_tokens(a);
    let tb = normalize_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    if ta == tb {
        return 1.0;
    }

    let (short, long) = if ta.len() <= tb.len() { (&ta, &tb) } else { (&tb, &ta) };
    let overlap = if is_contiguous_run(short, long) {
        short.len()
    } else {
        let mut used = vec![false; long.len()];
        short
            .iter()
            .filter(|token| {
                let hit = long
                    .iter()
                    .enumerate()
                    .find(|(idx, other)| !used[*idx] && tokens_match(token, other));
                match hit {
                    Some((idx, _)) => {
                        used[idx] = true;
                        true
                    }
                    None => false,
                }
            })
            .count()
    };

    PARTIAL_SCALE * overlap as f64 / long.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_accents_and_corporate_forms() {
        assert_eq!(
            normalize_tokens("COPEL Distribuição S.A."),
            vec!["copel", "distribuicao", "s", "a"]
        );
        assert_eq!(normalize_tokens("Papelaria Central LTDA-ME"), vec!["papelaria", "central"]);
        assert!(normalize_tokens(" -- ").is_empty());
    }

    #[test]
    fn exact_normalized_match_scores_one() {
        assert_eq!(payee_similarity("Sanepar LTDA", "SANEPAR"), 1.0);
        assert_eq!(payee_similarity("Água & Cia", "agua cia"), 1.0);
    }

    #[test]
    fn whole_word_substring_counts_all_tokens() {
        let score = payee_similarity("Copel", "Copel Distribuição");
        assert!((score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn ocr_typos_overlap_through_jaro_winkler() {
        let score = payee_similarity("Imobiliaria Centrall", "Imobiliária Central");
        assert!(score > 0.85 && score < 1.0, "score was {score}");
    }

    #[test]
    fn unrelated_names_score_zero() {
        assert_eq!(payee_similarity("Vivo Telefonia", "Sanepar"), 0.0);
        assert_eq!(payee_similarity("", "Sanepar"), 0.0);
    }
}
