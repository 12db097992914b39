//! Vector Math Kernels
//!
//! Elementwise float operations with a vectorized fast path and a scalar
//! fallback. The path is chosen once per process by a runtime capability
//! probe and cached; every call afterwards is a plain branch on that value.
//!
//! # Dispatch
//!
//! | Target    | Fast path        | Lanes |
//! |-----------|------------------|-------|
//! | x86_64    | AVX (if present) | 8     |
//! | aarch64   | NEON             | 4     |
//! | otherwise | scalar           | 1     |
//!
//! The vector paths use a separate multiply and add (no fused multiply-add)
//! and the same comparison semantics as the scalar loops, so both paths give
//! bit-identical results for finite input. Lengths that are not a multiple
//! of the lane width finish in the scalar tail loop.
//!
//! # Slices instead of counts
//!
//! Every kernel works on `min(len)` of its arguments, so a short slice never
//! causes an out-of-bounds access. In-place use goes through [`apply_gain`];
//! the two-operand kernels take a separate destination because Rust does not
//! allow a `&mut` and `&` borrow of the same buffer.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::util::EPSILON;

/// Which kernel implementation this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    Scalar,
    /// 256-bit AVX on x86_64
    Avx,
    /// 128-bit NEON on aarch64
    Neon,
}

impl SimdLevel {
    #[cfg(target_arch = "x86_64")]
    fn detect() -> Self {
        if is_x86_feature_detected!("avx") {
            Self::Avx
        } else {
            Self::Scalar
        }
    }

    #[cfg(target_arch = "aarch64")]
    fn detect() -> Self {
        if std::arch::is_aarch64_feature_detected!("neon") {
            Self::Neon
        } else {
            Self::Scalar
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    fn detect() -> Self {
        Self::Scalar
    }

    /// Number of f32 lanes processed per vector instruction
    pub fn lane_width(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Avx => 8,
            Self::Neon => 4,
        }
    }
}

// Read-only after first access; no teardown needed.
static SIMD_LEVEL: Lazy<SimdLevel> = Lazy::new(|| {
    let level = SimdLevel::detect();
    debug!("Vector kernels using {:?} path", level);
    level
});

/// The cached dispatch decision
#[inline]
pub fn simd_level() -> SimdLevel {
    *SIMD_LEVEL
}

/// Whether a vectorized path is in use
pub fn is_simd_available() -> bool {
    simd_level() != SimdLevel::Scalar
}

/// `dest[i] += src[i] * k`
#[inline]
pub fn multiply_add(dest: &mut [f32], src: &[f32], k: f32) {
    let n = dest.len().min(src.len());
    let (dest, src) = (&mut dest[..n], &src[..n]);
    match simd_level() {
        // SAFETY: the AVX level is only selected after runtime detection
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { avx::multiply_add(dest, src, k) },
        // SAFETY: the NEON level is only selected after runtime detection
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::multiply_add(dest, src, k) },
        _ => scalar::multiply_add(dest, src, k),
    }
}

/// `dest[i] = src[i] * k`
#[inline]
pub fn multiply(dest: &mut [f32], src: &[f32], k: f32) {
    let n = dest.len().min(src.len());
    let (dest, src) = (&mut dest[..n], &src[..n]);
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { avx::multiply(dest, src, k) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::multiply(dest, src, k) },
        _ => scalar::multiply(dest, src, k),
    }
}

/// `buffer[i] *= k`
#[inline]
pub fn apply_gain(buffer: &mut [f32], k: f32) {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { avx::apply_gain(buffer, k) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::apply_gain(buffer, k) },
        _ => scalar::apply_gain(buffer, k),
    }
}

/// `dest[i] = max(a[i], b[i])`
#[inline]
pub fn max(dest: &mut [f32], a: &[f32], b: &[f32]) {
    let n = dest.len().min(a.len()).min(b.len());
    let (dest, a, b) = (&mut dest[..n], &a[..n], &b[..n]);
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { avx::max(dest, a, b) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::max(dest, a, b) },
        _ => scalar::max(dest, a, b),
    }
}

/// `dest[i] = min(a[i], b[i])`
#[inline]
pub fn min(dest: &mut [f32], a: &[f32], b: &[f32]) {
    let n = dest.len().min(a.len()).min(b.len());
    let (dest, a, b) = (&mut dest[..n], &a[..n], &b[..n]);
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { avx::min(dest, a, b) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::min(dest, a, b) },
        _ => scalar::min(dest, a, b),
    }
}

/// `dest[i] = 20 * log10(max(|src[i]|, 1e-8))`
///
/// There is no vector log10 on either target, so every level runs the
/// scalar loop here.
#[inline]
pub fn to_decibels(dest: &mut [f32], src: &[f32]) {
    let n = dest.len().min(src.len());
    scalar::to_decibels(&mut dest[..n], &src[..n]);
}

/// Reference implementations, also used for the vector tails
pub mod scalar {
    use super::EPSILON;

    pub fn multiply_add(dest: &mut [f32], src: &[f32], k: f32) {
        for (d, s) in dest.iter_mut().zip(src) {
            *d += *s * k;
        }
    }

    pub fn multiply(dest: &mut [f32], src: &[f32], k: f32) {
        for (d, s) in dest.iter_mut().zip(src) {
            *d = *s * k;
        }
    }

    pub fn apply_gain(buffer: &mut [f32], k: f32) {
        for sample in buffer.iter_mut() {
            *sample *= k;
        }
    }

    // Same selection rule as maxps/minps: the second operand wins ties.
    pub fn max(dest: &mut [f32], a: &[f32], b: &[f32]) {
        for ((d, x), y) in dest.iter_mut().zip(a).zip(b) {
            *d = if *x > *y { *x } else { *y };
        }
    }

    pub fn min(dest: &mut [f32], a: &[f32], b: &[f32]) {
        for ((d, x), y) in dest.iter_mut().zip(a).zip(b) {
            *d = if *x < *y { *x } else { *y };
        }
    }

    pub fn to_decibels(dest: &mut [f32], src: &[f32]) {
        for (d, s) in dest.iter_mut().zip(src) {
            *d = 20.0 * s.abs().max(EPSILON).log10();
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod avx {
    use std::arch::x86_64::*;

    const LANES: usize = 8;

    // All functions expect slices already trimmed to a common length.

    #[target_feature(enable = "avx")]
    pub unsafe fn multiply_add(dest: &mut [f32], src: &[f32], k: f32) {
        let end = dest.len() - dest.len() % LANES;
        let kv = _mm256_set1_ps(k);
        let mut i = 0;
        while i < end {
            let s = _mm256_loadu_ps(src.as_ptr().add(i));
            let d = _mm256_loadu_ps(dest.as_ptr().add(i));
            _mm256_storeu_ps(dest.as_mut_ptr().add(i), _mm256_add_ps(d, _mm256_mul_ps(s, kv)));
            i += LANES;
        }
        super::scalar::multiply_add(&mut dest[end..], &src[end..], k);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn multiply(dest: &mut [f32], src: &[f32], k: f32) {
        let end = dest.len() - dest.len() % LANES;
        let kv = _mm256_set1_ps(k);
        let mut i = 0;
        while i < end {
            let s = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(dest.as_mut_ptr().add(i), _mm256_mul_ps(s, kv));
            i += LANES;
        }
        super::scalar::multiply(&mut dest[end..], &src[end..], k);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn apply_gain(buffer: &mut [f32], k: f32) {
        let end = buffer.len() - buffer.len() % LANES;
        let kv = _mm256_set1_ps(k);
        let mut i = 0;
        while i < end {
            let ptr = buffer.as_mut_ptr().add(i);
            _mm256_storeu_ps(ptr, _mm256_mul_ps(_mm256_loadu_ps(ptr), kv));
            i += LANES;
        }
        super::scalar::apply_gain(&mut buffer[end..], k);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn max(dest: &mut [f32], a: &[f32], b: &[f32]) {
        let end = dest.len() - dest.len() % LANES;
        let mut i = 0;
        while i < end {
            let x = _mm256_loadu_ps(a.as_ptr().add(i));
            let y = _mm256_loadu_ps(b.as_ptr().add(i));
            _mm256_storeu_ps(dest.as_mut_ptr().add(i), _mm256_max_ps(x, y));
            i += LANES;
        }
        super::scalar::max(&mut dest[end..], &a[end..], &b[end..]);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn min(dest: &mut [f32], a: &[f32], b: &[f32]) {
        let end = dest.len() - dest.len() % LANES;
        let mut i = 0;
        while i < end {
            let x = _mm256_loadu_ps(a.as_ptr().add(i));
            let y = _mm256_loadu_ps(b.as_ptr().add(i));
            _mm256_storeu_ps(dest.as_mut_ptr().add(i), _mm256_min_ps(x, y));
            i += LANES;
        }
        super::scalar::min(&mut dest[end..], &a[end..], &b[end..]);
    }
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    const LANES: usize = 4;

    #[target_feature(enable = "neon")]
    pub unsafe fn multiply_add(dest: &mut [f32], src: &[f32], k: f32) {
        let end = dest.len() - dest.len() % LANES;
        let kv = vdupq_n_f32(k);
        let mut i = 0;
        while i < end {
            let s = vld1q_f32(src.as_ptr().add(i));
            let d = vld1q_f32(dest.as_ptr().add(i));
            vst1q_f32(dest.as_mut_ptr().add(i), vaddq_f32(d, vmulq_f32(s, kv)));
            i += LANES;
        }
        super::scalar::multiply_add(&mut dest[end..], &src[end..], k);
    }

    #[target_feature(enable = "neon")]
    pub unsafe fn multiply(dest: &mut [f32], src: &[f32], k: f32) {
        let end = dest.len() - dest.len() % LANES;
        let kv = vdupq_n_f32(k);
        let mut i = 0;
        while i < end {
            let s = vld1q_f32(src.as_ptr().add(i));
            vst1q_f32(dest.as_mut_ptr().add(i), vmulq_f32(s, kv));
            i += LANES;
        }
        super::scalar::multiply(&mut dest[end..], &src[end..], k);
    }

    #[target_feature(enable = "neon")]
    pub unsafe fn apply_gain(buffer: &mut [f32], k: f32) {
        let end = buffer.len() - buffer.len() % LANES;
        let kv = vdupq_n_f32(k);
        let mut i = 0;
        while i < end {
            let ptr = buffer.as_mut_ptr().add(i);
            vst1q_f32(ptr, vmulq_f32(vld1q_f32(ptr), kv));
            i += LANES;
        }
        super::scalar::apply_gain(&mut buffer[end..], k);
    }

    #[target_feature(enable = "neon")]
    pub unsafe fn max(dest: &mut [f32], a: &[f32], b: &[f32]) {
        let end = dest.len() - dest.len() % LANES;
        let mut i = 0;
        while i < end {
            let x = vld1q_f32(a.as_ptr().add(i));
            let y = vld1q_f32(b.as_ptr().add(i));
            vst1q_f32(dest.as_mut_ptr().add(i), vmaxq_f32(x, y));
            i += LANES;
        }
        super::scalar::max(&mut dest[end..], &a[end..], &b[end..]);
    }

    #[target_feature(enable = "neon")]
    pub unsafe fn min(dest: &mut [f32], a: &[f32], b: &[f32]) {
        let end = dest.len() - dest.len() % LANES;
        let mut i = 0;
        while i < end {
            let x = vld1q_f32(a.as_ptr().add(i));
            let y = vld1q_f32(b.as_ptr().add(i));
            vst1q_f32(dest.as_mut_ptr().add(i), vminq_f32(x, y));
            i += LANES;
        }
        super::scalar::min(&mut dest[end..], &a[end..], &b[end..]);
    }
}
