//! Decimation fidelity against a naive reference decimator.
//!
//! A second-order sigma-delta modulator turns a 1 kHz sine into a 1.024 MHz
//! PDM bitstream (÷64 → 16 kHz). The filter bank's output is compared with
//! a direct cascade of four length-64 moving sums on the same bits.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::f64::consts::PI;

use pdm::PdmFilterBank;
use platform::audio_types::{BitOrder, Endianness, HighPassCoefficient, MicGainDb};
use platform::PdmCaptureConfig;

const DECIMATION: usize = 64;
const OUTPUT_RATE: usize = 16_000;
const PDM_RATE: usize = OUTPUT_RATE * DECIMATION;
const TONE_HZ: f64 = 1_000.0;
const FRAMES: usize = 60;
const WARMUP_FRAMES: usize = 20;
const SAMPLES_PER_FRAME: usize = OUTPUT_RATE / 1000;

/// MOD2 sigma-delta: STF = z⁻¹, NTF = (1 − z⁻¹)².
fn sigma_delta(signal: impl Iterator<Item = f64>) -> Vec<bool> {
    let (mut i1, mut i2) = (0.0_f64, 0.0_f64);
    signal
        .map(|u| {
            let v = if i2 >= 0.0 { 1.0 } else { -1.0 };
            i1 += u - v;
            i2 += i1 - v;
            v > 0.0
        })
        .collect()
}

fn tone(amplitude: f64, bits: usize) -> Vec<bool> {
    sigma_delta(
        (0..bits).map(|n| amplitude * (2.0 * PI * TONE_HZ * n as f64 / PDM_RATE as f64).sin()),
    )
}

/// Pack bits MSB-first into bytes.
fn pack(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b)))
        .collect()
}

/// Interleave per-channel byte streams and form little-endian words.
fn interleave_words(channels: &[Vec<u8>]) -> Vec<u16> {
    let len = channels[0].len();
    let bytes: Vec<u8> = (0..len)
        .flat_map(|k| channels.iter().map(move |ch| ch[k]))
        .collect();
    bytes
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Four cascaded length-D moving sums, sampled once per D bits, normalized.
fn reference_decimator(bits: &[bool]) -> Vec<f64> {
    let mut stage: Vec<f64> = bits.iter().map(|&b| if b { 1.0 } else { -1.0 }).collect();
    for _ in 0..4 {
        let mut next = vec![0.0; stage.len()];
        let mut sum = 0.0;
        for n in 0..stage.len() {
            sum += stage[n];
            if n >= DECIMATION {
                sum -= stage[n - DECIMATION];
            }
            next[n] = sum;
        }
        stage = next;
    }
    let norm = (DECIMATION as f64).powi(4);
    stage
        .iter()
        .skip(DECIMATION - 1)
        .step_by(DECIMATION)
        .map(|v| v / norm)
        .collect()
}

/// Amplitude and phase of the 1 kHz component (16 samples per period).
fn tone_component(samples: &[f64]) -> (f64, f64) {
    let (mut i, mut q) = (0.0, 0.0);
    for (n, &s) in samples.iter().enumerate() {
        let w = 2.0 * PI * TONE_HZ * n as f64 / OUTPUT_RATE as f64;
        i += s * w.cos();
        q += s * w.sin();
    }
    let scale = 2.0 / samples.len() as f64;
    ((i * scale).hypot(q * scale), q.atan2(i))
}

fn run_bank(mut bank: PdmFilterBank, words: &[u16]) -> (Vec<f64>, Vec<f64>) {
    let words_per_frame = bank.raw_words_per_frame().unwrap();
    let channels = bank.channel_count();
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pcm = vec![0i16; SAMPLES_PER_FRAME * channels];
    for block in words.chunks(words_per_frame) {
        let n = bank.process_interleaved(block, &mut pcm).unwrap();
        assert_eq!(n, SAMPLES_PER_FRAME * channels);
        for frame in pcm.chunks(channels) {
            left.push(f64::from(frame[0]) / 32767.0);
            if channels > 1 {
                right.push(f64::from(frame[1]) / 32767.0);
            }
        }
    }
    (left, right)
}

fn unity_bank(channels: usize, high_pass: HighPassCoefficient) -> PdmFilterBank {
    let mut bank = PdmFilterBank::init(channels, BitOrder::MsbFirst, Endianness::Little, high_pass)
        .unwrap();
    for ch in 0..channels {
        bank.configure(ch, OUTPUT_RATE as u32, MicGainDb::UNITY, DECIMATION as u32)
            .unwrap();
    }
    bank
}

fn phase_diff_deg(a: f64, b: f64) -> f64 {
    let mut d = (a - b).to_degrees();
    while d > 180.0 {
        d -= 360.0;
    }
    while d < -180.0 {
        d += 360.0;
    }
    d.abs()
}

#[test]
fn stereo_reference_config_yields_32_interleaved_samples_per_half() {
    let config = PdmCaptureConfig::reference();
    let mut bank = PdmFilterBank::from_config(&config).unwrap();
    let words = config.raw_words_per_half();
    assert_eq!(words, 128);

    let raw = vec![0xAAAA_u16; words];
    let mut pcm = [0i16; 32];
    assert_eq!(bank.process_interleaved(&raw, &mut pcm), Ok(32));
    assert_eq!(bank.samples_per_frame(0), Ok(16));
    assert_eq!(bank.samples_per_frame(1), Ok(16));
}

#[test]
fn one_khz_tone_matches_reference_decimator() {
    let bits = tone(0.5, FRAMES * SAMPLES_PER_FRAME * DECIMATION);
    let silence = sigma_delta(std::iter::repeat(0.0).take(bits.len()));
    let words = interleave_words(&[pack(&bits), pack(&silence)]);

    let (left, right) = run_bank(unity_bank(2, HighPassCoefficient::BYPASS), &words);
    let reference = reference_decimator(&bits);
    assert_eq!(left.len(), reference.len());

    let window = WARMUP_FRAMES * SAMPLES_PER_FRAME..left.len();
    let (amp, phase) = tone_component(&left[window.clone()]);
    let (ref_amp, ref_phase) = tone_component(&reference[window.clone()]);

    assert!(
        (amp - ref_amp).abs() / ref_amp < 0.02,
        "amplitude {amp:.4} vs reference {ref_amp:.4}"
    );
    assert!(
        phase_diff_deg(phase, ref_phase) < 5.0,
        "phase {phase:.3} vs reference {ref_phase:.3}"
    );

    // sinc⁴ droop at 1 kHz for ÷64 is ≈0.975.
    assert!((amp - 0.5 * 0.975).abs() < 0.02, "amplitude {amp:.4}");

    let (silent_amp, _) = tone_component(&right[window]);
    assert!(silent_amp < 0.005, "crosstalk {silent_amp:.5}");
}

#[test]
fn dc_blocker_keeps_tone_within_tolerance() {
    let bits = tone(0.5, FRAMES * SAMPLES_PER_FRAME * DECIMATION);
    let words = interleave_words(&[pack(&bits), pack(&bits)]);

    let (left, _) = run_bank(unity_bank(2, HighPassCoefficient::REFERENCE), &words);
    let reference = reference_decimator(&bits);

    let window = WARMUP_FRAMES * SAMPLES_PER_FRAME..left.len();
    let (amp, phase) = tone_component(&left[window.clone()]);
    let (ref_amp, ref_phase) = tone_component(&reference[window]);

    assert!((amp - ref_amp).abs() / ref_amp < 0.02, "amplitude {amp:.4} vs {ref_amp:.4}");
    assert!(phase_diff_deg(phase, ref_phase) < 5.0);
}

#[test]
fn dc_offset_is_removed_by_high_pass() {
    let bits = sigma_delta(std::iter::repeat(0.25).take(FRAMES * SAMPLES_PER_FRAME * DECIMATION));
    let words = interleave_words(&[pack(&bits)]);

    let (with_hp, _) = run_bank(unity_bank(1, HighPassCoefficient::REFERENCE), &words);
    let (without, _) = run_bank(unity_bank(1, HighPassCoefficient::BYPASS), &words);

    let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
    let tail = WARMUP_FRAMES * SAMPLES_PER_FRAME * 2;
    assert!((mean(&without[tail..]) - 0.25).abs() < 0.01);
    assert!(mean(&with_hp[tail..]).abs() < 0.01);
}

#[test]
fn gain_scales_output_linearly_in_db() {
    let bits = tone(0.05, FRAMES * SAMPLES_PER_FRAME * DECIMATION);
    let words = interleave_words(&[pack(&bits)]);

    let mut bank = PdmFilterBank::init(
        1,
        BitOrder::MsbFirst,
        Endianness::Little,
        HighPassCoefficient::BYPASS,
    )
    .unwrap();
    bank.configure(0, OUTPUT_RATE as u32, MicGainDb::new(20).unwrap(), DECIMATION as u32)
        .unwrap();
    let (boosted, _) = run_bank(bank, &words);
    let (unity, _) = run_bank(unity_bank(1, HighPassCoefficient::BYPASS), &words);

    let window = WARMUP_FRAMES * SAMPLES_PER_FRAME..unity.len();
    let (a20, _) = tone_component(&boosted[window.clone()]);
    let (a0, _) = tone_component(&unity[window]);
    assert!((a20 / a0 - 10.0).abs() < 0.2, "ratio {}", a20 / a0);
}
