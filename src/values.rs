// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `values` module defines the host contract the FASL decoder builds
//! values through. The decoder never allocates a Lisp object itself — it
//! only knows opcodes and wire layout — so every constructor, mutator, and
//! classifier it needs is expressed here as a trait the embedding runtime
//! implements over its own heap representation.

use num_complex::Complex64;

use crate::errors::Result;

/// Constructs, mutates, and classifies the dynamically typed Lisp value `V`
/// that a decoded FASL stream is materialized into.
///
/// Implementors own the heap; `fasl-core` only calls through this trait, the
/// same separation `symphonia-core`'s codec registry draws between a decoder
/// and the `AudioBuffer` types it fills.
///
/// Mutators (`set_car`, `set_vector_elem`, ...) exist because the decoder must
/// be able to publish a not-yet-fully-built composite into the definition
/// table before decoding its children, so that a child which refers back to
/// it (direct or indirect cyclic structure) observes a valid, if partially
/// filled, object rather than dangling state. Read accessors (`car`, `cdr`,
/// `is_cons`, `fixnum_value`, ...) exist because the decoder walks values it
/// has just decoded (list lengths, hash pairs, slot-name lists) without
/// knowing their representation.
pub trait ValueFactory {
    type Value: Clone;

    // Atoms.
    fn nil(&mut self) -> Self::Value;
    fn t(&mut self) -> Self::Value;
    fn make_false(&mut self) -> Self::Value;
    fn eof_object(&mut self) -> Self::Value;
    fn make_fixnum(&mut self, value: i64) -> Self::Value;
    fn make_flonum(&mut self, value: f64) -> Self::Value;
    fn make_complex(&mut self, value: Complex64) -> Self::Value;
    fn make_character(&mut self, code: u32) -> Self::Value;
    fn make_string(&mut self, bytes: &[u8]) -> Self::Value;

    // Symbols and the name registries they resolve through.
    fn make_uninterned_symbol(&mut self, name: &str) -> Self::Value;
    fn intern_symbol(&mut self, package: &Self::Value, name: &str) -> Self::Value;
    fn resolve_package(&mut self, name: &str) -> Result<Self::Value>;
    fn resolve_subr(&mut self, name: &str) -> Result<Self::Value>;

    // Conses and lists.
    fn make_cons(&mut self, car: Self::Value, cdr: Self::Value) -> Self::Value;
    fn set_car(&mut self, cell: &Self::Value, car: Self::Value);
    fn set_cdr(&mut self, cell: &Self::Value, cdr: Self::Value);

    // Vectors.
    fn make_vector(&mut self, len: usize, fill: Self::Value) -> Self::Value;
    fn set_vector_elem(&mut self, vector: &Self::Value, index: usize, value: Self::Value);

    // Structures.
    fn make_structure(&mut self, metadata: Self::Value, len: usize) -> Self::Value;
    fn set_structure_elem(&mut self, structure: &Self::Value, index: usize, value: Self::Value);
    fn resolve_struct_layout(&mut self, name: &Self::Value) -> Result<Self::Value>;

    // Hash tables.
    fn make_hash(&mut self, shallow: bool) -> Self::Value;
    fn hash_set(&mut self, hash: &Self::Value, key: Self::Value, value: Self::Value);

    // Instances.
    fn new_instance(&mut self, prototype: Self::Value) -> Self::Value;
    fn add_instance_slot(&mut self, instance: &Self::Value, name: &Self::Value);
    fn clone_instance(&mut self, base: Self::Value) -> Self::Value;
    fn set_instance_slot_by_index(&mut self, instance: &Self::Value, index: usize, value: Self::Value);

    // Closures and macros.
    fn make_closure(&mut self, env: Self::Value, code: Self::Value, props: Self::Value) -> Self::Value;
    fn make_macro(&mut self, closure: Self::Value) -> Self::Value;

    // Fast-ops.
    fn make_fast_op(&mut self, opcode: i64, args: &[Self::Value]) -> Self::Value;

    // Classifiers and read accessors.
    fn is_nil(&self, value: &Self::Value) -> bool;
    fn is_false(&self, value: &Self::Value) -> bool;
    fn is_eof(&self, value: &Self::Value) -> bool;
    fn is_cons(&self, value: &Self::Value) -> bool;
    fn is_package(&self, value: &Self::Value) -> bool;
    fn car(&self, cons: &Self::Value) -> Self::Value;
    fn cdr(&self, cons: &Self::Value) -> Self::Value;
    fn fixnum_value(&self, value: &Self::Value) -> Option<i64>;
    fn string_bytes(&self, value: &Self::Value) -> Option<Vec<u8>>;
}
