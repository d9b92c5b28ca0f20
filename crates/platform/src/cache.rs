//! Data-cache maintenance for DMA handoffs.
//!
//! The Cortex-M7 D-cache sits between the CPU and SRAM while DMA engines
//! bypass it. Two operations keep both sides coherent:
//!
//! | Direction | Operation | When |
//! |-----------|-----------|------|
//! | DMA → CPU | invalidate | before reading a half the DMA just filled |
//! | CPU → DMA | clean | after writing data the DMA will fetch |
//!
//! Callers do not invoke these directly; [`DmaRegion`](crate::dma::DmaRegion)
//! brackets every scoped access with the right one.
//!
//! If the buffers sit in an MPU region configured as non-cacheable, use
//! [`NoCache`].
//!
//! Reference: ST AN4839, Level 1 cache on STM32F7 Series and STM32H7 Series.

/// Cache maintenance by address range.
pub trait CacheMaintenance {
    /// Discard cached copies of `addr..addr + len` so the next CPU read
    /// fetches memory.
    ///
    /// `addr` and `len` should be cache-line aligned: partially covered
    /// lines lose any dirty CPU data they hold.
    fn invalidate(&mut self, addr: usize, len: usize);

    /// Write dirty cached copies of `addr..addr + len` back to memory.
    fn clean(&mut self, addr: usize, len: usize);
}

impl<C: CacheMaintenance + ?Sized> CacheMaintenance for &mut C {
    fn invalidate(&mut self, addr: usize, len: usize) {
        (**self).invalidate(addr, len);
    }

    fn clean(&mut self, addr: usize, len: usize) {
        (**self).clean(addr, len);
    }
}

/// No-op maintenance for cache-disabled cores or non-cacheable regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CacheMaintenance for NoCache {
    fn invalidate(&mut self, _addr: usize, _len: usize) {}

    fn clean(&mut self, _addr: usize, _len: usize) {}
}

/// Cortex-M7 L1 data cache, driven through the SCB by-address operations.
#[cfg(feature = "hardware")]
pub struct CortexM7DataCache {
    scb: cortex_m::peripheral::SCB,
}

#[cfg(feature = "hardware")]
impl CortexM7DataCache {
    /// Take ownership of the SCB for cache maintenance.
    pub fn new(scb: cortex_m::peripheral::SCB) -> Self {
        Self { scb }
    }

    /// Give the SCB back (e.g. to disable the cache before a reset).
    pub fn free(self) -> cortex_m::peripheral::SCB {
        self.scb
    }
}

#[cfg(feature = "hardware")]
impl CacheMaintenance for CortexM7DataCache {
    fn invalidate(&mut self, addr: usize, len: usize) {
        // SAFETY: the streaming core only invalidates DMA halves it owns,
        // validated at arm time to be cache-line aligned, so no unrelated
        // data shares the discarded lines.
        unsafe { self.scb.invalidate_dcache_by_address(addr, len) };
    }

    fn clean(&mut self, addr: usize, len: usize) {
        self.scb.clean_dcache_by_address(addr, len);
    }
}
