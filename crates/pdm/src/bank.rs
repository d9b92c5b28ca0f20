//! Multi-channel filter bank over one interleaved PDM block.
//!
//! A raw block is the capture DMA's view of one 1 ms frame: 16-bit words,
//! split into bytes by the configured [`Endianness`], with byte
//! `k·channels + c` belonging to channel `c`.

use heapless::Vec;
use platform::audio_types::{
    BitOrder, ChannelCount, DecimationFactor, Endianness, HighPassCoefficient, MicGainDb,
    SampleRateHz, MAX_CHANNELS,
};
use platform::PdmCaptureConfig;
use thiserror::Error;

use crate::filter::{ChannelFilter, ChannelSettings};

/// Filter bank errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterError {
    /// Zero channels, or more than [`MAX_CHANNELS`].
    #[error("unsupported channel count {0}")]
    UnsupportedChannelCount(usize),
    /// Channel index beyond the count given to `init`.
    #[error("channel {channel} out of range for {channels} channels")]
    ChannelOutOfRange {
        /// Requested channel.
        channel: usize,
        /// Channels in the bank.
        channels: usize,
    },
    /// Decimation ratio the CIC does not implement.
    #[error("invalid decimation factor {0}")]
    InvalidDecimationFactor(u32),
    /// Output rate out of range or not a whole number of kHz.
    #[error("unsupported output rate {0} Hz")]
    UnsupportedOutputRate(u32),
    /// `process` on a channel that was never configured.
    #[error("channel {channel} not configured")]
    NotConfigured {
        /// Unconfigured channel.
        channel: usize,
    },
    /// Raw block holds fewer words than one frame.
    #[error("raw block has {got} words, need {needed}")]
    BlockTooShort {
        /// Words required.
        needed: usize,
        /// Words supplied.
        got: usize,
    },
    /// Output slice cannot hold one frame.
    #[error("output has {got} slots, need {needed}")]
    OutputTooShort {
        /// Slots required.
        needed: usize,
        /// Slots supplied.
        got: usize,
    },
    /// Channels produce frames of different lengths and cannot be
    /// interleaved.
    #[error("channels have mismatched frame lengths")]
    MismatchedFrames,
}

/// Per-channel PDM→PCM converters sharing one raw block layout.
#[derive(Debug, Clone)]
pub struct PdmFilterBank {
    channels: Vec<Option<ChannelFilter>, MAX_CHANNELS>,
    bit_order: BitOrder,
    endianness: Endianness,
    high_pass: HighPassCoefficient,
}

impl PdmFilterBank {
    /// Create `channel_count` unconfigured channels.
    ///
    /// # Errors
    ///
    /// [`FilterError::UnsupportedChannelCount`] if `channel_count` is 0 or
    /// exceeds [`MAX_CHANNELS`].
    pub fn init(
        channel_count: usize,
        bit_order: BitOrder,
        endianness: Endianness,
        high_pass: HighPassCoefficient,
    ) -> Result<Self, FilterError> {
        let count = ChannelCount::new(channel_count)
            .map_err(|_| FilterError::UnsupportedChannelCount(channel_count))?;
        let mut channels = Vec::new();
        for _ in 0..count.get() {
            channels
                .push(None)
                .map_err(|_| FilterError::UnsupportedChannelCount(channel_count))?;
        }
        Ok(Self {
            channels,
            bit_order,
            endianness,
            high_pass,
        })
    }

    /// `init` followed by `configure` on every channel.
    pub fn from_config(config: &PdmCaptureConfig) -> Result<Self, FilterError> {
        let mut bank = Self::init(
            config.channels().get(),
            config.bit_order(),
            config.endianness(),
            config.high_pass(),
        )?;
        for channel in 0..bank.channel_count() {
            bank.configure(
                channel,
                config.output_rate().get(),
                config.gain(),
                config.decimation().ratio(),
            )?;
        }
        Ok(bank)
    }

    /// Set the conversion ratio for `channel`; the PDM bit rate is
    /// `output_rate_hz × decimation`. Clears that channel's state.
    ///
    /// # Errors
    ///
    /// [`FilterError::ChannelOutOfRange`], [`FilterError::UnsupportedOutputRate`]
    /// or [`FilterError::InvalidDecimationFactor`].
    pub fn configure(
        &mut self,
        channel: usize,
        output_rate_hz: u32,
        gain: MicGainDb,
        decimation: u32,
    ) -> Result<(), FilterError> {
        let channels = self.channels.len();
        let slot = self
            .channels
            .get_mut(channel)
            .ok_or(FilterError::ChannelOutOfRange { channel, channels })?;
        let samples_per_frame = SampleRateHz::new(output_rate_hz)
            .ok()
            .and_then(SampleRateHz::samples_per_ms)
            .ok_or(FilterError::UnsupportedOutputRate(output_rate_hz))?;
        let decimation = DecimationFactor::try_from(decimation)
            .map_err(FilterError::InvalidDecimationFactor)?;

        let settings = ChannelSettings {
            decimation,
            gain,
            samples_per_frame,
        };
        *slot = Some(ChannelFilter::new(settings, self.bit_order, self.high_pass));

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "pdm: ch{} decimate /{} -> {} Hz, {} dB",
            channel,
            decimation.ratio(),
            output_rate_hz,
            gain.get()
        );
        Ok(())
    }

    /// Number of channels given to `init`.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// PCM samples `process` produces for `channel`.
    pub fn samples_per_frame(&self, channel: usize) -> Result<usize, FilterError> {
        Ok(self.filter(channel)?.settings().samples_per_frame)
    }

    /// Raw block length in words for one frame of every channel.
    ///
    /// # Errors
    ///
    /// [`FilterError::NotConfigured`] if any channel is unconfigured.
    pub fn raw_words_per_frame(&self) -> Result<usize, FilterError> {
        let mut bytes = 0usize;
        for channel in 0..self.channel_count() {
            bytes = bytes.max(self.filter(channel)?.settings().bytes_per_frame());
        }
        Ok(self.words_for(bytes))
    }

    /// Convert one frame of `channel` from `raw_block` into `out`.
    ///
    /// Returns the number of samples written (`output_rate / 1000`).
    pub fn process(
        &mut self,
        raw_block: &[u16],
        channel: usize,
        out: &mut [i16],
    ) -> Result<usize, FilterError> {
        let stride = self.channel_count();
        let endianness = self.endianness;
        let words_needed = self.words_for(self.filter(channel)?.settings().bytes_per_frame());
        let filter = self.filter_mut(channel)?;
        let settings = *filter.settings();

        check_len(raw_block.len(), words_needed, FilterError::block_too_short)?;
        check_len(out.len(), settings.samples_per_frame, FilterError::output_too_short)?;

        let bytes = channel_bytes(raw_block, endianness, channel, stride)
            .take(settings.bytes_per_frame());
        Ok(filter.push_bytes(bytes, out.iter_mut()))
    }

    /// Convert one frame of every channel, writing samples
    /// channel-interleaved (`out[i·channels + c]`).
    ///
    /// Returns the number of samples written (frame × channels).
    pub fn process_interleaved(
        &mut self,
        raw_block: &[u16],
        out: &mut [i16],
    ) -> Result<usize, FilterError> {
        let stride = self.channel_count();
        let words_needed = self.raw_words_per_frame()?;
        let first = self.filter(0)?.settings().samples_per_frame;
        for channel in 1..stride {
            if self.filter(channel)?.settings().samples_per_frame != first {
                return Err(FilterError::MismatchedFrames);
            }
        }
        check_len(raw_block.len(), words_needed, FilterError::block_too_short)?;
        let total = first.saturating_mul(stride);
        check_len(out.len(), total, FilterError::output_too_short)?;

        let endianness = self.endianness;
        for (channel, filter) in self.channels.iter_mut().enumerate() {
            let Some(filter) = filter else {
                return Err(FilterError::NotConfigured { channel });
            };
            let bytes = channel_bytes(raw_block, endianness, channel, stride)
                .take(filter.settings().bytes_per_frame());
            let slots = out.iter_mut().skip(channel).step_by(stride).take(first);
            filter.push_bytes(bytes, slots);
        }
        Ok(total)
    }

    /// Clear every channel's accumulators, keeping configuration.
    pub fn reset(&mut self) {
        for filter in self.channels.iter_mut().flatten() {
            filter.reset();
        }
    }

    fn filter(&self, channel: usize) -> Result<&ChannelFilter, FilterError> {
        let channels = self.channel_count();
        self.channels
            .get(channel)
            .ok_or(FilterError::ChannelOutOfRange { channel, channels })?
            .as_ref()
            .ok_or(FilterError::NotConfigured { channel })
    }

    fn filter_mut(&mut self, channel: usize) -> Result<&mut ChannelFilter, FilterError> {
        let channels = self.channel_count();
        self.channels
            .get_mut(channel)
            .ok_or(FilterError::ChannelOutOfRange { channel, channels })?
            .as_mut()
            .ok_or(FilterError::NotConfigured { channel })
    }

    /// Words covering `bytes_per_channel` bytes of every channel.
    fn words_for(&self, bytes_per_channel: usize) -> usize {
        bytes_per_channel
            .saturating_mul(self.channel_count())
            .div_ceil(2)
    }
}

impl FilterError {
    fn block_too_short(needed: usize, got: usize) -> Self {
        Self::BlockTooShort { needed, got }
    }

    fn output_too_short(needed: usize, got: usize) -> Self {
        Self::OutputTooShort { needed, got }
    }
}

fn check_len(
    got: usize,
    needed: usize,
    err: fn(usize, usize) -> FilterError,
) -> Result<(), FilterError> {
    if got < needed {
        Err(err(needed, got))
    } else {
        Ok(())
    }
}

/// Stream-ordered bytes of `channel` out of an interleaved block.
fn channel_bytes(
    raw_block: &[u16],
    endianness: Endianness,
    channel: usize,
    stride: usize,
) -> impl Iterator<Item = u8> + '_ {
    raw_block
        .iter()
        .flat_map(move |&word| endianness.word_bytes(word))
        .skip(channel)
        .step_by(stride)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn stereo() -> PdmFilterBank {
        PdmFilterBank::from_config(&PdmCaptureConfig::reference()).unwrap()
    }

    #[test]
    fn test_init_rejects_bad_channel_counts() {
        for n in [0, MAX_CHANNELS + 1] {
            let err = PdmFilterBank::init(
                n,
                BitOrder::MsbFirst,
                Endianness::Little,
                HighPassCoefficient::BYPASS,
            )
            .unwrap_err();
            assert_eq!(err, FilterError::UnsupportedChannelCount(n));
        }
    }

    #[test]
    fn test_process_before_configure_fails() {
        let mut bank = PdmFilterBank::init(
            2,
            BitOrder::MsbFirst,
            Endianness::Little,
            HighPassCoefficient::REFERENCE,
        )
        .unwrap();
        let mut out = [0i16; 16];
        assert_eq!(
            bank.process(&[0; 128], 0, &mut out),
            Err(FilterError::NotConfigured { channel: 0 })
        );
        assert_eq!(
            bank.raw_words_per_frame(),
            Err(FilterError::NotConfigured { channel: 0 })
        );
    }

    #[test]
    fn test_configure_validates_arguments() {
        let mut bank = PdmFilterBank::init(
            1,
            BitOrder::MsbFirst,
            Endianness::Little,
            HighPassCoefficient::REFERENCE,
        )
        .unwrap();
        assert_eq!(
            bank.configure(1, 16_000, MicGainDb::UNITY, 64),
            Err(FilterError::ChannelOutOfRange { channel: 1, channels: 1 })
        );
        assert_eq!(
            bank.configure(0, 16_000, MicGainDb::UNITY, 63),
            Err(FilterError::InvalidDecimationFactor(63))
        );
        assert_eq!(
            bank.configure(0, 44_100, MicGainDb::UNITY, 64),
            Err(FilterError::UnsupportedOutputRate(44_100))
        );
        assert_eq!(
            bank.configure(0, 1_000_000, MicGainDb::UNITY, 64),
            Err(FilterError::UnsupportedOutputRate(1_000_000))
        );
        assert!(bank.configure(0, 48_000, MicGainDb::UNITY, 32).is_ok());
        assert_eq!(bank.samples_per_frame(0), Ok(48));
    }

    #[test]
    fn test_reference_geometry() {
        let bank = stereo();
        assert_eq!(bank.samples_per_frame(1), Ok(16));
        assert_eq!(bank.raw_words_per_frame(), Ok(128));
    }

    #[test]
    fn test_short_block_and_output_rejected() {
        let mut bank = stereo();
        let mut out = [0i16; 32];
        assert_eq!(
            bank.process_interleaved(&[0; 127], &mut out),
            Err(FilterError::BlockTooShort { needed: 128, got: 127 })
        );
        assert_eq!(
            bank.process_interleaved(&[0; 128], &mut out[..31]),
            Err(FilterError::OutputTooShort { needed: 32, got: 31 })
        );
        assert_eq!(
            bank.process(&[0; 128], 0, &mut out[..15]),
            Err(FilterError::OutputTooShort { needed: 16, got: 15 })
        );
    }

    #[test]
    fn test_interleaved_places_each_channel_at_its_stride() {
        let mut bank = PdmFilterBank::init(
            2,
            BitOrder::MsbFirst,
            Endianness::Little,
            HighPassCoefficient::BYPASS,
        )
        .unwrap();
        bank.configure(0, 16_000, MicGainDb::UNITY, 64).unwrap();
        bank.configure(1, 16_000, MicGainDb::UNITY, 64).unwrap();

        // Little-endian words: low byte is channel 0 (all ones), high byte
        // channel 1 (all zeros).
        let block = [0x00FF_u16; 128];
        let mut out = [0i16; 32];
        for _ in 0..4 {
            assert_eq!(bank.process_interleaved(&block, &mut out), Ok(32));
        }
        assert!(out.iter().step_by(2).all(|&s| s == i16::MAX), "{out:?}");
        assert!(out.iter().skip(1).step_by(2).all(|&s| s == -i16::MAX), "{out:?}");
    }

    #[test]
    fn test_big_endian_swaps_channels() {
        let mut bank = PdmFilterBank::init(
            2,
            BitOrder::MsbFirst,
            Endianness::Big,
            HighPassCoefficient::BYPASS,
        )
        .unwrap();
        bank.configure(0, 16_000, MicGainDb::UNITY, 64).unwrap();
        bank.configure(1, 16_000, MicGainDb::UNITY, 64).unwrap();
        let block = [0x00FF_u16; 128];
        let mut left = [0i16; 16];
        for _ in 0..4 {
            bank.process(&block, 0, &mut left).unwrap();
        }
        assert_eq!(left[15], -i16::MAX);
    }

    #[test]
    fn test_mismatched_rates_cannot_interleave() {
        let mut bank = PdmFilterBank::init(
            2,
            BitOrder::MsbFirst,
            Endianness::Little,
            HighPassCoefficient::BYPASS,
        )
        .unwrap();
        bank.configure(0, 16_000, MicGainDb::UNITY, 64).unwrap();
        bank.configure(1, 8_000, MicGainDb::UNITY, 128).unwrap();
        let mut out = [0i16; 64];
        assert_eq!(
            bank.process_interleaved(&[0; 128], &mut out),
            Err(FilterError::MismatchedFrames)
        );
    }

    #[test]
    fn test_reset_makes_processing_repeatable() {
        let block: [u16; 128] = core::array::from_fn(|i| (i as u16).wrapping_mul(0x9E37));
        let mut bank = stereo();
        let mut first = [0i16; 32];
        bank.process_interleaved(&block, &mut first).unwrap();
        let mut scratch = [0i16; 32];
        bank.process_interleaved(&block, &mut scratch).unwrap();

        bank.reset();
        let mut again = [0i16; 32];
        bank.process_interleaved(&block, &mut again).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_sustained_dc_settles_to_silence() {
        // All ones: full-scale positive DC on both channels.
        let block = [0xFFFF_u16; 128];
        let mut bank = stereo();
        let mut out = [0i16; 32];
        for _ in 0..200 {
            bank.process_interleaved(&block, &mut out).unwrap();
        }
        assert_eq!(out, [0i16; 32]);
    }
}
