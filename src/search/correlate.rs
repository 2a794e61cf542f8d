use crate::audio::chroma::{FeatureMatrix, NORM_EPSILON};

/// Normalized cross-correlation between a reference and a candidate
/// feature matrix.
///
/// Both matrices are flattened row-major, z-scored, and slid against each
/// other in "valid" mode: one score per offset at which the reference is
/// fully contained in the candidate, so the series has length
/// `candidate - reference + 1`, or is empty when the reference is longer.
/// Scores are divided by the reference length, giving an average
/// per-sample similarity that is comparable across calls but not a bounded
/// Pearson coefficient.
pub fn cross_correlate(reference: &FeatureMatrix, candidate: &FeatureMatrix) -> Vec<f32> {
    let reference_flat = zscore(reference.flat());
    let candidate_flat = zscore(candidate.flat());

    if reference_flat.is_empty() || candidate_flat.len() < reference_flat.len() {
        return Vec::new();
    }

    let n = reference_flat.len();
    let offsets = candidate_flat.len() - n + 1;
    let mut scores = Vec::with_capacity(offsets);
    for offset in 0..offsets {
        let dot: f32 = reference_flat
            .iter()
            .zip(&candidate_flat[offset..offset + n])
            .map(|(r, c)| r * c)
            .sum();
        scores.push(dot / n as f32);
    }

    scores
}

/// Converts a raw correlation offset to seconds relative to the candidate
/// buffer's start.
///
/// The offset indexes the row-major flattened candidate, so it is divided
/// by the row count to recover a frame index. For offsets not divisible by
/// the row count this conflates the feature axis with the time axis; the
/// truncation is kept as-is for compatibility with the established output.
pub fn offset_to_seconds(offset: usize, rows: usize, hop_length: usize, sample_rate: u32) -> f64 {
    let frame = offset / rows;
    frame as f64 * hop_length as f64 / sample_rate as f64
}

/// Index and value of the highest score, `None` on an empty series.
pub fn peak(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, &v)| (i, v))
}

fn zscore(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    let std = variance.sqrt();
    values.iter().map(|v| (v - mean) / (std + NORM_EPSILON)).collect()
}
