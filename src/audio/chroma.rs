use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::decode::AudioBuffer;

/// Pitch-class cardinality: one row per semitone of the octave.
pub const PITCH_CLASSES: usize = 12;

/// Guard against near-zero deviation when normalizing.
pub const NORM_EPSILON: f32 = 1e-8;

const FFT_SIZE: usize = 4096;
const MIN_HZ: f32 = 55.0;
const MAX_HZ: f32 = 8000.0;

/// Row-major pitch-class energy matrix: `PITCH_CLASSES` rows, one column
/// per analysis frame. Each column is independently normalized so that
/// correlation is driven by the pitch-class pattern, not raw energy.
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of analysis frames.
    pub fn frame_count(&self) -> usize {
        self.cols
    }

    /// Row-major flattened view, the order the correlation step consumes.
    pub fn flat(&self) -> &[f32] {
        &self.data
    }
}

/// Spreads one FFT bin's magnitude across the two pitch classes its
/// frequency falls between.
struct BinWeight {
    bin: usize,
    pc_low: usize,
    w_low: f32,
    pc_high: usize,
    w_high: f32,
}

/// Deterministic waveform -> chromagram transform. Identical samples and
/// configuration always produce an identical matrix.
pub struct ChromaExtractor {
    sample_rate: u32,
    hop_length: usize,
    window: Vec<f32>,
    weights: Vec<BinWeight>,
}

impl ChromaExtractor {
    pub fn new(sample_rate: u32, hop_length: usize) -> Self {
        Self {
            sample_rate,
            hop_length,
            window: hann_window(FFT_SIZE),
            weights: build_bin_weights(sample_rate),
        }
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds spanned by one analysis frame.
    pub fn seconds_per_frame(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    pub fn extract(&self, audio: &AudioBuffer) -> FeatureMatrix {
        self.extract_samples(&audio.samples)
    }

    pub fn extract_samples(&self, samples: &[f32]) -> FeatureMatrix {
        let cols = samples.len() / self.hop_length;

        let frames: Vec<[f32; PITCH_CLASSES]> = (0..cols)
            .into_par_iter()
            .map(|frame_idx| {
                let center = frame_idx * self.hop_length;
                let start = center.saturating_sub(FFT_SIZE / 2);
                let end = (start + FFT_SIZE).min(samples.len());

                let mut fft_input: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
                for i in 0..(end - start) {
                    fft_input[i] = Complex::new(samples[start + i] * self.window[i], 0.0);
                }

                // Per-thread FFT planner (rayon-safe)
                let mut planner = FftPlanner::<f32>::new();
                let fft = planner.plan_fft_forward(FFT_SIZE);
                fft.process(&mut fft_input);

                let mut chroma = [0.0f32; PITCH_CLASSES];
                for w in &self.weights {
                    let magnitude = fft_input[w.bin].norm();
                    chroma[w.pc_low] += magnitude * w.w_low;
                    chroma[w.pc_high] += magnitude * w.w_high;
                }
                chroma
            })
            .collect();

        // Row-major layout with per-column normalization
        let mut data = vec![0.0f32; PITCH_CLASSES * cols];
        for (col, chroma) in frames.iter().enumerate() {
            let mean = chroma.iter().sum::<f32>() / PITCH_CLASSES as f32;
            let variance =
                chroma.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / PITCH_CLASSES as f32;
            let std = variance.sqrt();
            for (row, &v) in chroma.iter().enumerate() {
                data[row * cols + col] = (v - mean) / (std + NORM_EPSILON);
            }
        }

        FeatureMatrix {
            rows: PITCH_CLASSES,
            cols,
            data,
        }
    }
}

fn build_bin_weights(sample_rate: u32) -> Vec<BinWeight> {
    let freq_resolution = sample_rate as f32 / FFT_SIZE as f32;
    let max_hz = MAX_HZ.min(sample_rate as f32 * 0.49);
    let mut weights = Vec::new();

    for bin in 1..FFT_SIZE / 2 {
        let freq = bin as f32 * freq_resolution;
        if freq < MIN_HZ || freq > max_hz {
            continue;
        }
        let semitone = 69.0 + 12.0 * (freq / 440.0).log2();
        let lower = semitone.floor();
        let frac = semitone - lower;
        let pc_low = (lower as i32).rem_euclid(12) as usize;
        let pc_high = (lower as i32 + 1).rem_euclid(12) as usize;
        weights.push(BinWeight {
            bin,
            pc_low,
            w_low: 1.0 - frac,
            pc_high,
            w_high: frac,
        });
    }

    weights
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, seconds: f32, sample_rate: u32) -> AudioBuffer {
        let n = (seconds * sample_rate as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect();
        AudioBuffer {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn frame_count_follows_hop_length() {
        let extractor = ChromaExtractor::new(22050, 1024);
        let audio = tone(440.0, 2.0, 22050);
        let features = extractor.extract(&audio);
        assert_eq!(features.rows(), PITCH_CLASSES);
        assert_eq!(features.frame_count(), audio.samples.len() / 1024);
    }

    #[test]
    fn pure_tone_peaks_at_its_pitch_class() {
        let extractor = ChromaExtractor::new(22050, 1024);
        // A4 = 440 Hz = pitch class 9
        let features = extractor.extract(&tone(440.0, 2.0, 22050));
        let cols = features.frame_count();
        for col in cols / 4..3 * cols / 4 {
            let column: Vec<f32> = (0..PITCH_CLASSES)
                .map(|row| features.flat()[row * cols + col])
                .collect();
            let argmax = column
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .unwrap()
                .0;
            assert_eq!(argmax, 9, "column {} peaked at {}", col, argmax);
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = ChromaExtractor::new(22050, 1024);
        let audio = tone(523.25, 1.0, 22050);
        let a = extractor.extract(&audio);
        let b = extractor.extract(&audio);
        assert_eq!(a.flat(), b.flat());
    }

    #[test]
    fn silence_never_produces_nan() {
        let extractor = ChromaExtractor::new(22050, 1024);
        let audio = AudioBuffer {
            samples: vec![0.0; 22050],
            sample_rate: 22050,
        };
        let features = extractor.extract(&audio);
        assert!(features.flat().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn short_input_yields_empty_matrix() {
        let extractor = ChromaExtractor::new(22050, 1024);
        let audio = AudioBuffer {
            samples: vec![0.0; 512],
            sample_rate: 22050,
        };
        assert_eq!(extractor.extract(&audio).frame_count(), 0);
    }
}
