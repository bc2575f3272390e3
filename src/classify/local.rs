//! Local keyword classifier. Deterministic, no I/O, never fails.

use crate::analysis::Category;
use crate::taxonomy::{diagnostic_terms, hit_counts, TAXONOMY};

/// Confidence added per matched indicator term.
pub const CONFIDENCE_PER_MATCH: f32 = 0.2;
/// Upper bound for keyword-derived confidence.
pub const MAX_LOCAL_CONFIDENCE: f32 = 0.9;
/// Low-confidence default when nothing matched.
pub const NO_MATCH_CONFIDENCE: f32 = 0.3;

/// Output of [`classify`]: the winning category plus the per-category evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalResult {
    pub category: Category,
    pub confidence: f32,
    /// Matched term count of the winning category (0 for `Other`).
    pub match_count: usize,
    /// Hit counts per classified category, in taxonomy order.
    pub hits: [usize; 5],
    /// Diagnostic vocabulary terms found in the input (for agreement scoring).
    pub diagnostics: Vec<&'static str>,
}

impl LocalResult {
    /// Hits recorded for `category` (0 for `Other`).
    pub fn hits_for(&self, category: Category) -> usize {
        TAXONOMY
            .iter()
            .position(|(c, _)| *c == category)
            .map(|i| self.hits[i])
            .unwrap_or(0)
    }
}

/// Score `text` against the taxonomy (case-insensitive, presence per term).
///
/// Strictly highest count wins; ties keep the first-listed category.
pub fn classify(text: &str) -> LocalResult {
    let lowered = text.to_lowercase();
    let hits = hit_counts(&lowered);
    let diagnostics: Vec<&'static str> = diagnostic_terms(&lowered).collect();

    let mut best: Option<(Category, usize)> = None;
    for (i, (category, _)) in TAXONOMY.iter().enumerate() {
        let n = hits[i];
        if n == 0 {
            continue;
        }
        match best {
            Some((_, top)) if n <= top => {}
            _ => best = Some((*category, n)),
        }
    }

    match best {
        Some((category, match_count)) => LocalResult {
            category,
            confidence: keyword_confidence(match_count),
            match_count,
            hits,
            diagnostics,
        },
        None => LocalResult {
            category: Category::Other,
            confidence: NO_MATCH_CONFIDENCE,
            match_count: 0,
            hits,
            diagnostics,
        },
    }
}

/// `min(matches * 0.2, 0.9)`, or the flat 0.3 default for zero matches.
pub fn keyword_confidence(match_count: usize) -> f32 {
    if match_count == 0 {
        NO_MATCH_CONFIDENCE
    } else {
        (match_count as f32 * CONFIDENCE_PER_MATCH).min(MAX_LOCAL_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn single_category_confidence_follows_formula() {
        let r = classify("Huge POTHOLE on the road near the new building");
        assert_eq!(r.category, Category::Infrastructure);
        assert_eq!(r.match_count, 3);
        assert!(approx(r.confidence, 0.6));
    }

    #[test]
    fn no_match_yields_other_with_flat_default() {
        let r = classify("My neighbour's cat keeps meowing");
        assert_eq!(r.category, Category::Other);
        assert!(approx(r.confidence, 0.3));
        assert_eq!(r.hits, [0; 5]);
    }

    #[test]
    fn tie_goes_to_first_listed_category() {
        // one infrastructure hit, one transportation hit
        let r = classify("sidewalk next to the parking");
        assert_eq!(r.category, Category::Infrastructure);
        assert_eq!(r.hits_for(Category::Transportation), 1);
    }

    #[test]
    fn strictly_higher_count_wins_over_order() {
        let r = classify("road with heavy traffic congestion and a broken signal");
        assert_eq!(r.category, Category::Transportation);
        assert!(approx(r.confidence, 0.6));
    }

    #[test]
    fn confidence_is_capped() {
        let r = classify("road bridge building street sidewalk construction pothole");
        assert_eq!(r.match_count, 7);
        assert!(approx(r.confidence, MAX_LOCAL_CONFIDENCE));
    }

    #[test]
    fn bridge_scenario_prefers_infrastructure() {
        let r = classify("The bridge on Main Street is cracking and dangerous");
        assert_eq!(r.category, Category::Infrastructure);
        assert_eq!(r.hits_for(Category::Safety), 1);
        assert!(approx(r.confidence, 0.4));
    }
}
