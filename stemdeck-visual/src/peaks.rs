//! Amplitude peak extraction with dominant-band tagging
//!
//! The engine never decodes audio; the host hands each track's decoded
//! sample buffer to the analyzer once, and rendering works from the
//! resulting fixed-size peak table.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Dominant frequency band of a peak point, used for waveform coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Band {
    /// Below 250Hz - kicks, bass
    Low,
    /// 250Hz-4kHz - vocals, instruments
    #[default]
    Mid,
    /// Above 4kHz - hats, cymbals, air
    High,
}

/// One column of the rendered waveform
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakPoint {
    /// Peak amplitude, 0.0..=1.0
    pub amplitude: f32,
    pub band: Band,
}

/// Downsampled peak table for one track
#[derive(Debug, Clone, Default)]
pub struct WaveformPeaks {
    pub points: Vec<PeakPoint>,
    pub duration_seconds: f64,
}

impl WaveformPeaks {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Amplitude at a normalized position 0.0..=1.0
    pub fn amplitude_at(&self, progress: f64) -> f32 {
        match self.point_at(progress) {
            Some(p) => p.amplitude,
            None => 0.0,
        }
    }

    pub fn point_at(&self, progress: f64) -> Option<PeakPoint> {
        if self.points.is_empty() {
            return None;
        }
        let idx = ((progress.clamp(0.0, 1.0) * self.points.len() as f64) as usize)
            .min(self.points.len() - 1);
        Some(self.points[idx])
    }
}

const BAND_FFT_SIZE: usize = 512;
const LOW_CUTOFF_HZ: f32 = 250.0;
const MID_CUTOFF_HZ: f32 = 4000.0;

/// Turns an interleaved stereo sample buffer into a peak table
pub struct PeakAnalyzer {
    sample_rate: u32,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
}

impl PeakAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(BAND_FFT_SIZE);
        let window = (0..BAND_FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / BAND_FFT_SIZE as f32).cos()))
            .collect();
        Self {
            sample_rate,
            fft,
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); BAND_FFT_SIZE],
        }
    }

    /// Analyze interleaved stereo samples into `target_points` columns
    pub fn analyze(
        &mut self,
        samples: &[f32],
        target_points: usize,
        duration_seconds: f64,
    ) -> WaveformPeaks {
        if samples.is_empty() || target_points == 0 {
            return WaveformPeaks {
                points: vec![PeakPoint::default(); target_points],
                duration_seconds,
            };
        }

        let frames = samples.len() / 2;
        let frames_per_point = (frames / target_points).max(1);
        let mut points = Vec::with_capacity(target_points);
        let mut mono = Vec::with_capacity(frames_per_point);

        for idx in 0..target_points {
            let start = idx * frames_per_point;
            let end = ((idx + 1) * frames_per_point).min(frames);
            if start >= frames {
                points.push(PeakPoint::default());
                continue;
            }

            mono.clear();
            let mut peak = 0.0f32;
            for frame in start..end {
                let i = frame * 2;
                let s = (samples[i] + samples.get(i + 1).copied().unwrap_or(0.0)) * 0.5;
                peak = peak.max(s.abs());
                mono.push(s);
            }

            let band = if mono.len() >= BAND_FFT_SIZE / 4 {
                self.dominant_band(&mono)
            } else {
                Band::Mid
            };
            points.push(PeakPoint {
                amplitude: peak.min(1.0),
                band,
            });
        }

        WaveformPeaks {
            points,
            duration_seconds,
        }
    }

    fn dominant_band(&mut self, mono: &[f32]) -> Band {
        let n = mono.len().min(BAND_FFT_SIZE);
        for i in 0..BAND_FFT_SIZE {
            let s = if i < n { mono[i] * self.window[i] } else { 0.0 };
            self.fft_buffer[i] = Complex::new(s, 0.0);
        }
        self.fft.process(&mut self.fft_buffer);

        let bin_width = self.sample_rate as f32 / BAND_FFT_SIZE as f32;
        let nyquist = BAND_FFT_SIZE / 2;
        let low_end = ((LOW_CUTOFF_HZ / bin_width) as usize).clamp(2, nyquist);
        let mid_end = ((MID_CUTOFF_HZ / bin_width) as usize).clamp(low_end, nyquist);

        let mean_energy = |range: std::ops::Range<usize>| -> f32 {
            let width = range.len().max(1) as f32;
            self.fft_buffer[range].iter().map(|c| c.norm_sqr()).sum::<f32>() / width
        };
        let low = mean_energy(1..low_end);
        let mid = mean_energy(low_end..mid_end);
        let high = mean_energy(mid_end..nyquist);

        if low >= mid && low >= high {
            Band::Low
        } else if high >= mid {
            Band::High
        } else {
            Band::Mid
        }
    }
}
