//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions reject out-of-range configuration at
//! construction time instead of at first use inside an interrupt handler:
//! - `SampleRateHz`: validates 8000–192000 Hz
//! - `ChannelCount`: 1..=[`MAX_CHANNELS`] PDM microphones
//! - `DecimationFactor`: only ratios the PDM decimator implements
//! - `MicGainDb`: −12..=51 dB post-decimation gain
//! - `HighPassCoefficient`: Q31 DC-blocker pole in [0, 1)

use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: i64,
    /// The inclusive minimum allowed value.
    pub min: i64,
    /// The inclusive maximum allowed value.
    pub max: i64,
}

impl OutOfRangeError {
    fn new(value: impl Into<i64>, min: impl Into<i64>, max: impl Into<i64>) -> Self {
        Self {
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// PCM output sample rate in Hz.
///
/// Valid range: 8000–192000 Hz. The PDM decimator additionally requires a
/// whole number of kHz (one frame = 1 ms of output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz (telephony).
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 192000 Hz.
    pub const MAX_HZ: u32 = 192_000;

    /// Reference PDM loopback rate: 16 kHz (8 kHz audio band).
    pub const REFERENCE: Self = Self(16_000);

    /// Create a `SampleRateHz`, returning an error if out of 8000–192000 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 192000`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if (Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(OutOfRangeError::new(hz, Self::MIN_HZ, Self::MAX_HZ))
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Output samples per 1 ms frame, or `None` if the rate is not a whole
    /// number of kHz.
    #[must_use]
    pub fn samples_per_ms(self) -> Option<usize> {
        if self.0 % 1000 == 0 {
            usize::try_from(self.0 / 1000).ok()
        } else {
            None
        }
    }
}

// ── ChannelCount ─────────────────────────────────────────────────────────────

/// Maximum number of PDM microphones one filter bank serves.
///
/// The SAI PDM interface exposes up to four microphone pairs, but byte
/// interleaving beyond four channels leaves too little time per half at
/// 480 MHz for the software decimator.
pub const MAX_CHANNELS: usize = 4;

/// Number of PDM channels, validated to 1..=[`MAX_CHANNELS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelCount(u8);

impl ChannelCount {
    /// Stereo microphone pair, as wired on the reference board.
    pub const STEREO: Self = Self(2);

    /// Create a `ChannelCount`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `count == 0` or `count > MAX_CHANNELS`.
    pub fn new(count: usize) -> Result<Self, OutOfRangeError> {
        match u8::try_from(count) {
            Ok(c) if c >= 1 && usize::from(c) <= MAX_CHANNELS => Ok(Self(c)),
            _ => Err(OutOfRangeError::new(
                i64::try_from(count).unwrap_or(i64::MAX),
                1,
                MAX_CHANNELS as i64,
            )),
        }
    }

    /// Return the channel count.
    #[must_use]
    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

// ── DecimationFactor ─────────────────────────────────────────────────────────

/// PDM→PCM decimation ratio (input bit rate / output sample rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecimationFactor {
    /// ÷16
    X16,
    /// ÷24
    X24,
    /// ÷32
    X32,
    /// ÷48
    X48,
    /// ÷64 (reference configuration)
    X64,
    /// ÷80
    X80,
    /// ÷128
    X128,
}

impl DecimationFactor {
    /// Every supported factor, smallest first.
    pub const ALL: [Self; 7] = [
        Self::X16,
        Self::X24,
        Self::X32,
        Self::X48,
        Self::X64,
        Self::X80,
        Self::X128,
    ];

    /// The ratio as an integer.
    #[must_use]
    pub const fn ratio(self) -> u32 {
        match self {
            Self::X16 => 16,
            Self::X24 => 24,
            Self::X32 => 32,
            Self::X48 => 48,
            Self::X64 => 64,
            Self::X80 => 80,
            Self::X128 => 128,
        }
    }
}

impl TryFrom<u32> for DecimationFactor {
    type Error = u32;

    /// Map a raw ratio to a factor, handing the raw value back if unsupported.
    fn try_from(ratio: u32) -> Result<Self, u32> {
        Self::ALL
            .into_iter()
            .find(|f| f.ratio() == ratio)
            .ok_or(ratio)
    }
}

// ── MicGainDb ────────────────────────────────────────────────────────────────

/// Post-decimation microphone gain in whole dB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct MicGainDb(i8);

impl MicGainDb {
    /// Lowest accepted gain.
    pub const MIN_DB: i8 = -12;
    /// Highest accepted gain.
    pub const MAX_DB: i8 = 51;
    /// Unity gain.
    pub const UNITY: Self = Self(0);
    /// Gain used by the reference loopback (MEMS mic, headphone out).
    pub const REFERENCE: Self = Self(24);

    /// Create a `MicGainDb`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] outside −12..=51 dB.
    pub fn new(db: i8) -> Result<Self, OutOfRangeError> {
        if (Self::MIN_DB..=Self::MAX_DB).contains(&db) {
            Ok(Self(db))
        } else {
            Err(OutOfRangeError::new(db, Self::MIN_DB, Self::MAX_DB))
        }
    }

    /// Return the gain in dB.
    #[must_use]
    pub fn get(self) -> i8 {
        self.0
    }
}

// ── HighPassCoefficient ──────────────────────────────────────────────────────

/// DC-blocker pole as a Q31 fraction in [0, 1).
///
/// Zero bypasses the high-pass stage entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct HighPassCoefficient(u32);

impl HighPassCoefficient {
    /// Q31 value used by the vendor loopback example (≈0.98829, ~30 Hz at 16 kHz).
    pub const REFERENCE: Self = Self(2_122_358_088);

    /// Bypass the high-pass stage.
    pub const BYPASS: Self = Self(0);

    const Q31_ONE: u32 = 1 << 31;

    /// Create from a raw Q31 value.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `raw >= 2^31` (a pole at or beyond 1.0
    /// is unstable).
    pub fn from_q31(raw: u32) -> Result<Self, OutOfRangeError> {
        if raw < Self::Q31_ONE {
            Ok(Self(raw))
        } else {
            Err(OutOfRangeError::new(raw, 0, Self::Q31_ONE - 1))
        }
    }

    /// Return the raw Q31 value.
    #[must_use]
    pub fn q31(self) -> u32 {
        self.0
    }

    /// Return the pole as a float in [0, 1).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Q31 → f32 keeps 24 significant bits, plenty for a pole
    pub fn as_f32(self) -> f32 {
        self.0 as f32 / Self::Q31_ONE as f32
    }

    /// `true` when the high-pass stage is disabled.
    #[must_use]
    pub fn is_bypass(self) -> bool {
        self.0 == 0
    }
}

// ── PDM sample format ────────────────────────────────────────────────────────

/// Order of PDM bits inside each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Bit 7 is the earliest sample (SAI PDM default).
    MsbFirst,
    /// Bit 0 is the earliest sample.
    LsbFirst,
}

/// Byte order of the 16-bit PDM words written by DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    /// Low byte first (Cortex-M native).
    Little,
    /// High byte first.
    Big,
}

impl Endianness {
    /// Split a DMA word into its two bytes in stream order.
    #[must_use]
    pub fn word_bytes(self, word: u16) -> [u8; 2] {
        match self {
            Self::Little => word.to_le_bytes(),
            Self::Big => word.to_be_bytes(),
        }
    }
}
