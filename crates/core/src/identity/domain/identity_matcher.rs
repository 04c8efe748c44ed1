//! Nearest-reference face identification by embedding distance.

use crate::shared::constants::UNKNOWN_NAME;

use super::reference_identity::ReferenceIdentity;

#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub name: String,
    pub trusted: bool,
    /// Distance to the nearest comparable reference, if any.
    pub distance: Option<f64>,
}

impl MatchOutcome {
    fn unknown(distance: Option<f64>) -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            trusted: false,
            distance,
        }
    }
}

/// Finds the reference nearest to `embedding`.
///
/// The match is trusted only when the nearest distance is strictly below
/// `threshold`. Ties keep the earliest reference. References whose
/// embedding length differs from the query are skipped.
pub fn match_identity(
    embedding: &[f32],
    references: &[ReferenceIdentity],
    threshold: f64,
) -> MatchOutcome {
    let mut best: Option<(&ReferenceIdentity, f64)> = None;
    for reference in references {
        if reference.embedding.len() != embedding.len() {
            log::debug!(
                "Skipping reference '{}': embedding length {} != {}",
                reference.name,
                reference.embedding.len(),
                embedding.len()
            );
            continue;
        }
        let distance = euclidean_distance(embedding, &reference.embedding);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((reference, distance));
        }
    }

    match best {
        Some((reference, distance)) if distance < threshold => MatchOutcome {
            name: reference.name.clone(),
            trusted: true,
            distance: Some(distance),
        },
        Some((_, distance)) => MatchOutcome::unknown(Some(distance)),
        None => MatchOutcome::unknown(None),
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
