//! PDM capture / PCM loopback configuration.
//!
//! [`PdmCaptureConfig`] is the validated description of one loopback
//! session. It is built through [`PdmCaptureConfigBuilder`], which rejects
//! out-of-range values at construction instead of at first use.
//!
//! # Clock chain (reference board)
//!
//! ```text
//! PLL2P (4.096 MHz) → SAI4 kernel clock
//!   → SAI4 frame rate = 8 × fs = 128 kHz
//!   → PDM bit clock   = fs × decimation = 16 kHz × 64 = 1.024 MHz
//! ```
//!
//! # Buffer geometry
//!
//! | Quantity | Formula | Reference |
//! |----------|---------|-----------|
//! | PCM samples per frame (1 ms) | fs / 1000 | 16 |
//! | PCM chunk per half | frame × channels | 32 |
//! | Raw PDM words per half | frame × decimation ÷ 8 × channels ÷ 2 | 128 |
//! | Capture buffer | 2 × raw words per half | 256 |

use thiserror::Error;

use crate::audio_types::{
    BitOrder, ChannelCount, DecimationFactor, Endianness, HighPassCoefficient, MicGainDb,
    OutOfRangeError, SampleRateHz,
};

/// Configuration validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Channel count outside 1..=`MAX_CHANNELS`.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(OutOfRangeError),
    /// Sample rate outside the supported range.
    #[error("sample rate out of range: {0}")]
    SampleRate(OutOfRangeError),
    /// Sample rate is not a whole number of kHz.
    #[error("output rate {0} Hz is not a whole number of kHz")]
    UnsupportedOutputRate(u32),
    /// Decimation ratio the filter does not implement.
    #[error("invalid decimation factor: {0}")]
    InvalidDecimationFactor(u32),
    /// Gain outside −12..=51 dB.
    #[error("gain out of range: {0}")]
    Gain(OutOfRangeError),
    /// High-pass pole at or beyond 1.0.
    #[error("high-pass coefficient out of range: {0}")]
    HighPass(OutOfRangeError),
    /// One frame of PDM does not fill a whole number of 16-bit DMA words.
    #[error("PDM frame of {bytes} bytes does not fill whole DMA words")]
    UnalignedFrame {
        /// Bytes per frame across all channels.
        bytes: usize,
    },
}

/// Validated loopback session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdmCaptureConfig {
    channels: ChannelCount,
    output_rate: SampleRateHz,
    decimation: DecimationFactor,
    gain: MicGainDb,
    high_pass: HighPassCoefficient,
    bit_order: BitOrder,
    endianness: Endianness,
    samples_per_frame: usize,
}

impl PdmCaptureConfig {
    /// Reference loopback: stereo MEMS pair, 16 kHz, ÷64, +24 dB, MSB-first,
    /// little-endian words, high-pass tap 2122358088.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            channels: ChannelCount::STEREO,
            output_rate: SampleRateHz::REFERENCE,
            decimation: DecimationFactor::X64,
            gain: MicGainDb::REFERENCE,
            high_pass: HighPassCoefficient::REFERENCE,
            bit_order: BitOrder::MsbFirst,
            endianness: Endianness::Little,
            samples_per_frame: 16,
        }
    }

    /// Start building a configuration from the reference values.
    #[must_use]
    pub fn builder() -> PdmCaptureConfigBuilder {
        PdmCaptureConfigBuilder::default()
    }

    /// Number of PDM microphones.
    pub fn channels(&self) -> ChannelCount {
        self.channels
    }

    /// PCM output rate.
    pub fn output_rate(&self) -> SampleRateHz {
        self.output_rate
    }

    /// Decimation ratio.
    pub fn decimation(&self) -> DecimationFactor {
        self.decimation
    }

    /// Post-decimation gain.
    pub fn gain(&self) -> MicGainDb {
        self.gain
    }

    /// DC-blocker pole.
    pub fn high_pass(&self) -> HighPassCoefficient {
        self.high_pass
    }

    /// PDM bit order within each byte.
    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    /// Byte order of DMA words.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// PCM samples per channel per 1 ms frame.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Interleaved PCM samples written per capture half.
    #[allow(clippy::arithmetic_side_effects)] // Safety: ≤ 192 × 4, validated at build
    pub fn pcm_chunk_samples(&self) -> usize {
        self.samples_per_frame * self.channels.get()
    }

    /// Raw PDM words per capture half (one frame, all channels).
    #[allow(clippy::arithmetic_side_effects)] // Safety: ≤ 192 × 128 / 8 × 4 / 2, validated at build
    pub fn raw_words_per_half(&self) -> usize {
        frame_bytes(self.samples_per_frame, self.decimation, self.channels) / 2
    }

    /// Minimum capture buffer length in words (two halves).
    #[allow(clippy::arithmetic_side_effects)] // Safety: see raw_words_per_half
    pub fn capture_buffer_words(&self) -> usize {
        self.raw_words_per_half() * 2
    }

    /// PDM bit clock driven to the microphones.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 192 000 × 128 < u32::MAX
    pub fn pdm_bit_clock_hz(&self) -> u32 {
        self.output_rate.get() * self.decimation.ratio()
    }

    /// SAI PDM frame rate (8 × fs with 16-bit slots and two mic pairs).
    #[allow(clippy::arithmetic_side_effects)] // Safety: 192 000 × 8 < u32::MAX
    pub fn sai_frame_rate_hz(&self) -> u32 {
        self.output_rate.get() * 8
    }
}

impl Default for PdmCaptureConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[allow(clippy::arithmetic_side_effects)] // Safety: all factors bounded by validated config ranges
fn frame_bytes(samples_per_frame: usize, decimation: DecimationFactor, channels: ChannelCount) -> usize {
    let bits = samples_per_frame * decimation.ratio() as usize;
    bits / 8 * channels.get()
}

/// Builder for [`PdmCaptureConfig`]; every setter takes raw values and
/// [`build`](Self::build) validates them together.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct PdmCaptureConfigBuilder {
    channels: usize,
    output_rate_hz: u32,
    decimation: u32,
    gain_db: i8,
    high_pass_q31: u32,
    bit_order: BitOrder,
    endianness: Endianness,
}

impl Default for PdmCaptureConfigBuilder {
    fn default() -> Self {
        Self {
            channels: ChannelCount::STEREO.get(),
            output_rate_hz: SampleRateHz::REFERENCE.get(),
            decimation: DecimationFactor::X64.ratio(),
            gain_db: MicGainDb::REFERENCE.get(),
            high_pass_q31: HighPassCoefficient::REFERENCE.q31(),
            bit_order: BitOrder::MsbFirst,
            endianness: Endianness::Little,
        }
    }
}

impl PdmCaptureConfigBuilder {
    /// Number of PDM microphones.
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// PCM output rate in Hz.
    pub fn output_rate_hz(mut self, hz: u32) -> Self {
        self.output_rate_hz = hz;
        self
    }

    /// Decimation ratio.
    pub fn decimation(mut self, ratio: u32) -> Self {
        self.decimation = ratio;
        self
    }

    /// Post-decimation gain in dB.
    pub fn gain_db(mut self, db: i8) -> Self {
        self.gain_db = db;
        self
    }

    /// DC-blocker pole as Q31 (0 = bypass).
    pub fn high_pass_q31(mut self, q31: u32) -> Self {
        self.high_pass_q31 = q31;
        self
    }

    /// PDM bit order.
    pub fn bit_order(mut self, order: BitOrder) -> Self {
        self.bit_order = order;
        self
    }

    /// DMA word byte order.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking channels, rate,
    /// decimation, gain, high-pass and frame alignment in that order.
    pub fn build(self) -> Result<PdmCaptureConfig, ConfigError> {
        let channels =
            ChannelCount::new(self.channels).map_err(ConfigError::UnsupportedChannelCount)?;
        let output_rate = SampleRateHz::new(self.output_rate_hz).map_err(ConfigError::SampleRate)?;
        let samples_per_frame = output_rate
            .samples_per_ms()
            .ok_or(ConfigError::UnsupportedOutputRate(self.output_rate_hz))?;
        let decimation = DecimationFactor::try_from(self.decimation)
            .map_err(ConfigError::InvalidDecimationFactor)?;
        let gain = MicGainDb::new(self.gain_db).map_err(ConfigError::Gain)?;
        let high_pass =
            HighPassCoefficient::from_q31(self.high_pass_q31).map_err(ConfigError::HighPass)?;

        let bytes = frame_bytes(samples_per_frame, decimation, channels);
        if bytes % 2 != 0 {
            return Err(ConfigError::UnalignedFrame { bytes });
        }

        Ok(PdmCaptureConfig {
            channels,
            output_rate,
            decimation,
            gain,
            high_pass,
            bit_order: self.bit_order,
            endianness: self.endianness,
            samples_per_frame,
        })
    }
}
