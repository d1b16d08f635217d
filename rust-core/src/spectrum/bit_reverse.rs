//! Bit-reversal permutation tables
//!
//! The iterative FFT scatters its input into bit-reversed order before the
//! butterfly passes. Tables for widths 1..=16 are built once, on first use,
//! and are read-only afterwards. Wider transforms compute the permutation
//! directly.

use std::sync::OnceLock;

/// Widest index (in bits) served from the precomputed tables
pub const MAX_FAST_BITS: u32 = 16;

/// Reverse the lowest `num_bits` bits of `index`
pub fn reverse_bits(mut index: usize, num_bits: u32) -> usize {
    let mut rev = 0;
    for _ in 0..num_bits {
        rev = (rev << 1) | (index & 1);
        index >>= 1;
    }
    rev
}

/// Lazily built bit-reversal lookup tables
///
/// One table per bit width, `tables[b - 1][i] == reverse_bits(i, b)`.
/// Initialization is guarded by a [`OnceLock`], so concurrent transforms
/// may share a cache through an `Arc`. Tearing the tables down needs
/// exclusive access, which keeps it from racing an in-flight transform.
#[derive(Debug, Default)]
pub struct BitReverseCache {
    tables: OnceLock<Vec<Box<[u32]>>>,
}

impl BitReverseCache {
    /// Create an empty cache; tables are built on first lookup
    pub const fn new() -> Self {
        Self {
            tables: OnceLock::new(),
        }
    }

    /// Whether the tables have been built
    pub fn is_initialized(&self) -> bool {
        self.tables.get().is_some()
    }

    /// Table for `num_bits`, building all tables on first call
    ///
    /// Returns `None` for widths outside `1..=MAX_FAST_BITS`.
    pub fn table(&self, num_bits: u32) -> Option<&[u32]> {
        if num_bits == 0 || num_bits > MAX_FAST_BITS {
            return None;
        }
        let tables = self.tables.get_or_init(build_tables);
        Some(&tables[num_bits as usize - 1])
    }

    /// Drop the tables; the next lookup rebuilds them
    pub fn clear(&mut self) {
        if self.tables.take().is_some() {
            tracing::debug!("bit reversal tables released");
        }
    }
}

fn build_tables() -> Vec<Box<[u32]>> {
    let tables: Vec<Box<[u32]>> = (1..=MAX_FAST_BITS)
        .map(|bits| {
            (0..1usize << bits)
                .map(|i| reverse_bits(i, bits) as u32)
                .collect()
        })
        .collect();

    tracing::debug!(max_bits = MAX_FAST_BITS, "bit reversal tables initialized");
    tables
}
