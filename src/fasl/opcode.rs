// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, ErrorLocation, Result};

/// Every opcode a FASL stream can contain. Byte values are assigned here
/// (the wire format carries no external opcode registry), grouped by
/// category for readability; nothing about the grouping is wire-visible.
///
/// The historical `NOP_1`/`NOP_2`/`NOP_3` and `COMMENT_1`/`COMMENT_2` byte
/// aliases collapse to one `Nop` and one `Comment` variant here: each alias
/// differed only in the width of no-op padding the original writer emitted,
/// never in behavior, and this reader has no bytewise-compatibility
/// obligation to a historical writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    // Structural / control, handled by the tail-recursive dispatch loop
    // without descending a decode frame.
    Nop = 0x00,
    Comment = 0x01,
    ResetReaderDefs = 0x02,

    // Definition-table plumbing.
    ReaderDefinition = 0x03,
    ReaderReference = 0x04,
    Eof = 0x05,

    // Atoms.
    Nil = 0x10,
    True = 0x11,
    False = 0x12,
    Character = 0x13,
    Fix8 = 0x14,
    Fix16 = 0x15,
    Fix32 = 0x16,
    Fix64 = 0x17,
    Float = 0x18,
    Complex = 0x19,
    String = 0x1a,

    // Composites.
    List = 0x20,
    ListD = 0x21,
    Vector = 0x22,
    Structure = 0x23,
    StructureLayout = 0x24,
    Hash = 0x25,
    InstanceMap = 0x26,
    Instance = 0x27,
    Closure = 0x28,
    Macro = 0x29,
    Symbol = 0x2a,
    Package = 0x2b,
    Subr = 0x2c,

    // Fast-ops, one opcode per argument arity.
    FastOp0 = 0x30,
    FastOp1 = 0x31,
    FastOp2 = 0x32,
    FastOp3 = 0x33,

    // Loader opcodes, meaningful only when a `LoaderHost` is driving the
    // decode (the loader entry point, not a plain `fast_read`).
    BeginLoadUnit = 0x40,
    EndLoadUnit = 0x41,
    LoaderDefineQ = 0x42,
    LoaderDefineA0 = 0x43,
    LoaderApply0 = 0x44,
    LoaderApplyN = 0x45,
    LoaderPush = 0x46,
    LoaderDrop = 0x47,
}

impl Opcode {
    pub fn from_byte(byte: u8, at: ErrorLocation) -> Result<Self> {
        use Opcode::*;
        Ok(match byte {
            0x00 => Nop,
            0x01 => Comment,
            0x02 => ResetReaderDefs,
            0x03 => ReaderDefinition,
            0x04 => ReaderReference,
            0x05 => Eof,
            0x10 => Nil,
            0x11 => True,
            0x12 => False,
            0x13 => Character,
            0x14 => Fix8,
            0x15 => Fix16,
            0x16 => Fix32,
            0x17 => Fix64,
            0x18 => Float,
            0x19 => Complex,
            0x1a => String,
            0x20 => List,
            0x21 => ListD,
            0x22 => Vector,
            0x23 => Structure,
            0x24 => StructureLayout,
            0x25 => Hash,
            0x26 => InstanceMap,
            0x27 => Instance,
            0x28 => Closure,
            0x29 => Macro,
            0x2a => Symbol,
            0x2b => Package,
            0x2c => Subr,
            0x30 => FastOp0,
            0x31 => FastOp1,
            0x32 => FastOp2,
            0x33 => FastOp3,
            0x40 => BeginLoadUnit,
            0x41 => EndLoadUnit,
            0x42 => LoaderDefineQ,
            0x43 => LoaderDefineA0,
            0x44 => LoaderApply0,
            0x45 => LoaderApplyN,
            0x46 => LoaderPush,
            0x47 => LoaderDrop,
            _ => return decode_error("invalid opcode", at),
        })
    }

    /// Whether this opcode is only meaningful while a [`crate::values::ValueFactory`]
    /// decode is being driven by a `LoaderHost` (see [`super::fast_read_with_loader`]).
    pub fn is_loader_only(self) -> bool {
        matches!(
            self,
            Opcode::BeginLoadUnit
                | Opcode::EndLoadUnit
                | Opcode::LoaderDefineQ
                | Opcode::LoaderDefineA0
                | Opcode::LoaderApply0
                | Opcode::LoaderApplyN
                | Opcode::LoaderPush
                | Opcode::LoaderDrop
        )
    }

    /// The fixed byte width a `FixN` opcode reads, or `None` for anything else.
    pub fn fixnum_width(self) -> Option<u8> {
        match self {
            Opcode::Fix8 => Some(1),
            Opcode::Fix16 => Some(2),
            Opcode::Fix32 => Some(4),
            Opcode::Fix64 => Some(8),
            _ => None,
        }
    }

    /// The fixed argument count a `FastOpN` opcode reads, or `None` for anything else.
    pub fn fast_op_arity(self) -> Option<usize> {
        match self {
            Opcode::FastOp0 => Some(0),
            Opcode::FastOp1 => Some(1),
            Opcode::FastOp2 => Some(2),
            Opcode::FastOp3 => Some(3),
            _ => None,
        }
    }
}
