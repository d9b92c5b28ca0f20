//! Single-channel PDM→PCM conversion chain.
//!
//! ```text
//! PDM bits ─► CIC⁴ ÷D ─► ÷D⁴ ─► DC blocker ─► × gain ─► round/saturate ─► i16
//! ```
//!
//! The CIC runs in wrapping `i32`. Its output is bounded by ±D⁴ (2²⁸ at
//! ÷128), so intermediate wrap-around cancels out in the comb stages.

use platform::audio_types::{BitOrder, DecimationFactor, HighPassCoefficient, MicGainDb};

/// Number of integrator/comb stages.
pub const CIC_ORDER: usize = 4;

const MSB_FIRST: [u8; 8] = [0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01];
const LSB_FIRST: [u8; 8] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];

/// Full-scale PCM amplitude.
const PCM_FULL_SCALE: f32 = 32767.0;

/// Cascaded integrator-comb decimator, differential delay 1.
#[derive(Debug, Clone)]
pub(crate) struct CicDecimator {
    ratio: u32,
    integrators: [i32; CIC_ORDER],
    combs: [i32; CIC_ORDER],
    phase: u32,
}

impl CicDecimator {
    pub(crate) fn new(decimation: DecimationFactor) -> Self {
        Self {
            ratio: decimation.ratio(),
            integrators: [0; CIC_ORDER],
            combs: [0; CIC_ORDER],
            phase: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.integrators = [0; CIC_ORDER];
        self.combs = [0; CIC_ORDER];
        self.phase = 0;
    }

    /// Feed one PDM bit (`true` = +1, `false` = −1); returns a decimated
    /// sample every `ratio` bits.
    fn push_bit(&mut self, bit: bool) -> Option<i32> {
        let mut x: i32 = if bit { 1 } else { -1 };
        for acc in &mut self.integrators {
            *acc = acc.wrapping_add(x);
            x = *acc;
        }

        self.phase = self.phase.wrapping_add(1);
        if self.phase < self.ratio {
            return None;
        }
        self.phase = 0;

        for delayed in &mut self.combs {
            let y = x.wrapping_sub(*delayed);
            *delayed = x;
            x = y;
        }
        Some(x)
    }

    /// Feed the eight bits of `byte` in `order`, calling `emit` for every
    /// decimated sample.
    pub(crate) fn push_byte(&mut self, byte: u8, order: BitOrder, mut emit: impl FnMut(i32)) {
        let masks = match order {
            BitOrder::MsbFirst => &MSB_FIRST,
            BitOrder::LsbFirst => &LSB_FIRST,
        };
        for &mask in masks {
            if let Some(sample) = self.push_bit(byte & mask != 0) {
                emit(sample);
            }
        }
    }
}

/// One-pole DC blocker: `y[n] = a·(y[n−1] + x[n] − x[n−1])`.
#[derive(Debug, Clone)]
pub(crate) struct DcBlocker {
    pole: f32,
    prev_in: f32,
    prev_out: f32,
}

impl DcBlocker {
    pub(crate) fn new(coefficient: HighPassCoefficient) -> Self {
        Self {
            pole: coefficient.as_f32(),
            prev_in: 0.0,
            prev_out: 0.0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.prev_in = 0.0;
        self.prev_out = 0.0;
    }

    #[allow(clippy::arithmetic_side_effects)] // f32: overflows to inf, never panics
    #[allow(clippy::float_cmp)] // exact zero is the bypass sentinel
    pub(crate) fn process(&mut self, x: f32) -> f32 {
        if self.pole == 0.0 {
            return x;
        }
        // Difference first: prev_out is far below the ulp of x once settled.
        let y = self.pole * (self.prev_out + (x - self.prev_in));
        self.prev_in = x;
        self.prev_out = y;
        y
    }
}

/// Per-channel conversion settings fixed by `configure`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSettings {
    /// Decimation ratio.
    pub decimation: DecimationFactor,
    /// Post-decimation gain.
    pub gain: MicGainDb,
    /// PCM samples per 1 ms frame.
    pub samples_per_frame: usize,
}

impl ChannelSettings {
    /// PDM bytes this channel consumes per frame.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: spf ≤ 192, ratio ≤ 128; every ratio is a multiple of 8
    pub fn bytes_per_frame(&self) -> usize {
        self.samples_per_frame * self.decimation.ratio() as usize / 8
    }
}

/// Stateful converter for one microphone.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    settings: ChannelSettings,
    bit_order: BitOrder,
    cic: CicDecimator,
    dc: DcBlocker,
    /// 1 / D⁴: maps CIC output to [-1, 1].
    normalize: f32,
    /// Linear gain × PCM full scale.
    output_scale: f32,
}

impl ChannelFilter {
    /// Build a filter with cleared accumulators.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // f32 only
    #[allow(clippy::cast_precision_loss)] // D⁴ ≤ 2²⁸ has at most 10 significant bits for every supported ratio
    pub fn new(
        settings: ChannelSettings,
        bit_order: BitOrder,
        high_pass: HighPassCoefficient,
    ) -> Self {
        let ratio = settings.decimation.ratio();
        let cic_gain = ratio.checked_pow(CIC_ORDER as u32).unwrap_or(u32::MAX);
        let linear_gain = libm::powf(10.0, f32::from(settings.gain.get()) / 20.0);
        Self {
            settings,
            bit_order,
            cic: CicDecimator::new(settings.decimation),
            dc: DcBlocker::new(high_pass),
            normalize: 1.0 / cic_gain as f32,
            output_scale: linear_gain * PCM_FULL_SCALE,
        }
    }

    /// Settings this filter was built with.
    #[must_use]
    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Clear accumulator and DC-blocker history.
    pub fn reset(&mut self) {
        self.cic.reset();
        self.dc.reset();
    }

    /// Convert a run of this channel's PDM bytes, writing each PCM sample
    /// to the next slot `out` yields. Returns the number of samples written.
    ///
    /// Samples produced once `out` is exhausted are still computed (the
    /// filter state must advance) but discarded.
    pub fn push_bytes<'o>(
        &mut self,
        bytes: impl IntoIterator<Item = u8>,
        out: impl IntoIterator<Item = &'o mut i16>,
    ) -> usize {
        let mut slots = out.into_iter();
        let mut written = 0usize;
        let Self {
            bit_order,
            cic,
            dc,
            normalize,
            output_scale,
            ..
        } = self;
        for byte in bytes {
            cic.push_byte(byte, *bit_order, |raw| {
                let pcm = to_pcm(dc.process(normalized(raw, *normalize)), *output_scale);
                if let Some(slot) = slots.next() {
                    *slot = pcm;
                    written = written.saturating_add(1);
                }
            });
        }
        written
    }
}

#[allow(clippy::arithmetic_side_effects)] // f32 only
#[allow(clippy::cast_precision_loss)] // |raw| ≤ 2²⁸
fn normalized(raw: i32, normalize: f32) -> f32 {
    raw as f32 * normalize
}

/// Scale to PCM, round half away from zero and saturate.
#[allow(clippy::arithmetic_side_effects)] // f32 only
#[allow(clippy::cast_possible_truncation)] // float→int `as` saturates; NaN maps to 0
fn to_pcm(x: f32, scale: f32) -> i16 {
    libm::roundf(x * scale) as i16
}
