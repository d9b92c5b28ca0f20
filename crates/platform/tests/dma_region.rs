//! Scoped DMA region access: bounds, halves and cache bracketing.

#![allow(clippy::indexing_slicing)]
#![allow(clippy::arithmetic_side_effects)]

use platform::dma_safety::{AxiSramRegion, DmaBuffer, Sram4Region};
use platform::mocks::{CacheOp, MockCache};
use platform::Half;

#[test]
fn half_ranges_split_the_buffer() {
    let mut buf: DmaBuffer<Sram4Region, [u16; 16]> = DmaBuffer::new([0; 16]);
    let region = buf.region();
    assert_eq!(region.half_len(), 8);
    assert_eq!(region.half_range(Half::First), 0..8);
    assert_eq!(region.half_range(Half::Second), 8..16);
    assert_eq!(Half::First.other(), Half::Second);
}

#[test]
fn read_invalidates_before_the_closure_sees_data() {
    let mut buf: DmaBuffer<Sram4Region, [u16; 32]> = DmaBuffer::new([7; 32]);
    let mut region = buf.region();
    let base = region.addr();
    let mut cache = MockCache::new();

    let sum = region
        .read_with(16..32, &mut cache, |words| {
            words.iter().map(|&w| u32::from(w)).sum::<u32>()
        })
        .unwrap();

    assert_eq!(sum, 16 * 7);
    assert_eq!(cache.ops(), &[CacheOp::Invalidate { addr: base + 32, len: 32 }]);
}

#[test]
fn write_cleans_after_the_closure() {
    let mut buf: DmaBuffer<AxiSramRegion, [i16; 64]> = DmaBuffer::new([0; 64]);
    let mut cache = MockCache::new();
    let base;
    {
        let mut region = buf.region();
        base = region.addr();
        region
            .write_with(32..48, &mut cache, |s| s.fill(-3))
            .unwrap();
    }
    assert_eq!(cache.ops(), &[CacheOp::Clean { addr: base + 64, len: 32 }]);
    assert!(buf.data()[32..48].iter().all(|&s| s == -3));
    assert!(buf.data()[..32].iter().all(|&s| s == 0));
}

#[test]
fn out_of_bounds_access_is_refused_without_cache_ops() {
    let mut buf: DmaBuffer<AxiSramRegion, [i16; 8]> = DmaBuffer::new([0; 8]);
    let mut region = buf.region();
    let mut cache = MockCache::new();

    assert!(region.write_with(4..9, &mut cache, |_| ()).is_none());
    assert!(region.read_with(9..9, &mut cache, |_| ()).is_none());
    assert!(cache.ops().is_empty());
}

#[test]
fn fill_covers_the_whole_region() {
    let mut buf: DmaBuffer<AxiSramRegion, [i16; 8]> = DmaBuffer::new([5; 8]);
    let mut cache = MockCache::new();
    buf.region().fill(0, &mut cache);
    assert_eq!(buf.data(), &[0; 8]);
    assert!(matches!(cache.ops(), [CacheOp::Clean { len: 16, .. }]));
}

#[test]
fn misaligned_half_is_detected() {
    // 24 i16 = 48 bytes: halves of 24 bytes do not span whole 32-byte lines.
    let mut buf: DmaBuffer<AxiSramRegion, [i16; 24]> = DmaBuffer::new([0; 24]);
    assert!(!buf.region().halves_cache_aligned(32));
}
