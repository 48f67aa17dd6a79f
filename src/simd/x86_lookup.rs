//! Runtime lookup of the target features required by the AVX-512 backend.
//!
//! The implementation is simple:
//! 1. Load a static variable caching the outcome of the lookup.
//! 2. If it is still uninitialized, query the CPU and store the result.
//!
//! Any subsequent calls only pay for a relaxed atomic load.

use core::sync::atomic::{AtomicU8, Ordering};

const UNINIT: u8 = 0;
const ABSENT: u8 = 1;
const PRESENT: u8 = 2;

static AVX512: AtomicU8 = AtomicU8::new(UNINIT);

/// Queries the CPU using the `is_x86_feature_detected` macro provided by
/// the Rust standard library.
fn detect() -> bool {
    let avx512f = std::arch::is_x86_feature_detected!("avx512f");
    let avx512dq = std::arch::is_x86_feature_detected!("avx512dq");
    tracing::debug!(avx512f, avx512dq, "detected x86 target features");
    avx512f && avx512dq
}

/// Whether AVX-512F and AVX-512DQ are available.
#[inline(always)]
pub(crate) fn has_avx512() -> bool {
    match AVX512.load(Ordering::Relaxed) {
        UNINIT => {
            // Racing threads arrive at the same answer.
            let present = detect();
            AVX512.store(if present { PRESENT } else { ABSENT }, Ordering::Relaxed);
            present
        }
        content => content == PRESENT,
    }
}
