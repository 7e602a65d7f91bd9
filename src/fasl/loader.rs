// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, ErrorLocation, Result};

/// The embedded loader's bounded operand stack (spec §3, constant `S`).
/// Depth, not contents, is what callers need to reason about, so this is a
/// thin `Vec` wrapper rather than a general-purpose stack type.
pub struct LoaderStack<V> {
    items: Vec<V>,
    capacity: usize,
}

impl<V> LoaderStack<V> {
    pub fn new(capacity: usize) -> Self {
        LoaderStack { items: Vec::with_capacity(capacity.min(64)), capacity }
    }

    pub fn push(&mut self, value: V, at: ErrorLocation) -> Result<()> {
        if self.items.len() >= self.capacity {
            return decode_error("fast-loader stack overflow/underflow", at);
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<V> {
        self.items.pop()
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pops `n` entries in last-pushed-first order, for `LOADER_APPLYN`'s
    /// argument list: `args[0]` is the most recently pushed value. Returns
    /// `None` if fewer than `n` entries are present, leaving the stack
    /// untouched.
    pub fn pop_n(&mut self, n: usize) -> Option<Vec<V>> {
        if self.items.len() < n {
            return None;
        }
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            args.push(self.items.pop().expect("length checked above"));
        }
        Some(args)
    }
}

/// The host operations the embedded loader needs from the evaluator/package
/// system while running `BEGIN_LOAD_UNIT` ... `END_LOAD_UNIT` side effects.
/// Kept deliberately narrow: the decoder drives *what* to apply and *what*
/// to bind, the host supplies *how*.
pub trait LoaderHost {
    type Value: Clone;

    /// Applies `proc` to `args`, returning its result. Used by
    /// `LOADER_APPLY0`/`LOADER_APPLYN` and by `LOADER_DEFINEA0`'s
    /// zero-argument application step.
    fn apply(&mut self, proc: &Self::Value, args: &[Self::Value]) -> Result<Self::Value>;

    /// Binds `symbol` to `value` in the global environment. Used by
    /// `LOADER_DEFINEQ`/`LOADER_DEFINEA0`.
    fn globally_bind(&mut self, symbol: &Self::Value, value: Self::Value) -> Result<()>;
}
