//! Numeric kernel
//!
//! A Leibniz-series approximation of π. The kernel never keeps a running
//! sum in a local: every step is loaded from and stored back into the
//! [`Accumulator`] it is given. With a plain `f64` that is a register; with
//! a [`ManagedValue`] every step goes through the confined handle, which is
//! the cost the confined strategies measure.

use confbench_store::ManagedValue;

/// Storage the kernel accumulates into
pub trait Accumulator {
    /// Current value
    fn load(&self) -> f64;

    /// Overwrite the value
    fn store(&mut self, value: f64);
}

impl Accumulator for f64 {
    #[inline]
    fn load(&self) -> f64 {
        *self
    }

    #[inline]
    fn store(&mut self, value: f64) {
        *self = value;
    }
}

impl Accumulator for ManagedValue<'_> {
    #[inline]
    fn load(&self) -> f64 {
        self.get()
    }

    #[inline]
    fn store(&mut self, value: f64) {
        self.set(value);
    }
}

/// Leibniz partial sum times four, accumulated through `acc`
///
/// Whatever `acc` held before is discarded. Returns the final value, which
/// is also left in `acc`. `inner_iterations == 0` yields `0.0`.
pub fn leibniz_pi<A: Accumulator + ?Sized>(acc: &mut A, inner_iterations: u64) -> f64 {
    acc.store(0.0);
    let mut sign = 1.0;
    for i in 0..inner_iterations {
        acc.store(acc.load() + sign / (i * 2 + 1) as f64);
        sign = -sign;
    }
    acc.store(acc.load() * 4.0);
    acc.load()
}

/// [`leibniz_pi`] on a throwaway plain accumulator
#[inline]
#[must_use]
pub fn leibniz_pi_plain(inner_iterations: u64) -> f64 {
    let mut acc = 0.0;
    leibniz_pi(&mut acc, inner_iterations)
}

/// Upper bound on `|π - leibniz_pi(n)|`: four times the first omitted term
#[inline]
#[must_use]
pub fn error_bound(inner_iterations: u64) -> f64 {
    4.0 / (inner_iterations * 2 + 1) as f64
}
