// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{debug, trace};
use num_complex::Complex64;

use super::defs::check_index_bound;
use super::loader::LoaderHost;
use super::opcode::Opcode;
use crate::errors::{decode_error, ErrorLocation, Result};
use crate::io::Port;
use crate::values::ValueFactory;

/// Upper bound on a definition-table index, independent of the table's own
/// lazy growth. A corrupt or adversarial stream cannot force an allocation
/// larger than this regardless of what length prefix it claims.
const MAX_TABLE_INDEX: usize = 1 << 24;

/// Decodes exactly one value from `port`. Loader opcodes are rejected: this
/// is the entry point used to read a single ordinary value off a port that
/// is not being driven by a [`LoaderHost`] (e.g. a plain data stream, or a
/// nested value read from inside a composite).
pub fn fast_read<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F) -> Result<F::Value> {
    read_dispatch(port, factory, None)
}

/// Decodes exactly one value from `port`, with loader opcodes enabled
/// against `host`. This is what [`fasl_load`] calls in a loop; it is also
/// callable directly to single-step a load.
pub fn fast_read_with_loader<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    host: &mut dyn LoaderHost<Value = F::Value>,
) -> Result<F::Value> {
    read_dispatch(port, factory, Some(host))
}

/// Repeatedly calls [`fast_read_with_loader`] until it yields the eof
/// sentinel, returning the number of ordinary (non-control, non-loader)
/// values it saw along the way. Loader opcodes perform their `define`/
/// `apply` side effects against `host` but are not themselves counted as
/// values, since they never produce one.
pub fn fasl_load<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    host: &mut dyn LoaderHost<Value = F::Value>,
) -> Result<usize> {
    let mut forms = 0usize;
    loop {
        let value = fast_read_with_loader(port, factory, host)?;
        if factory.is_eof(&value) {
            return Ok(forms);
        }
        forms += 1;
    }
}

fn require_host<'h, 'p, V>(
    host: &'h mut Option<&'p mut dyn LoaderHost<Value = V>>,
    at: ErrorLocation,
) -> Result<&'h mut dyn LoaderHost<Value = V>> {
    match host {
        Some(h) => Ok(&mut **h),
        None => decode_error("loader ops not allowed", at),
    }
}

/// Reads a nested value expected to be a fixnum (lengths, table indices,
/// fast-op opcode numbers, and `LOADER_APPLYN`'s argument count are all
/// encoded this way rather than as raw binary integers, so that they can
/// themselves participate in shared structure like any other value).
fn read_length<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F) -> Result<i64> {
    let at = port.error_location();
    let value = fast_read(port, factory)?;
    factory.fixnum_value(&value).ok_or(()).or_else(|_| decode_error("expected fixnum for length", at))
}

fn read_nonneg_length<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F) -> Result<usize> {
    let at = port.error_location();
    let n = read_length(port, factory)?;
    if n < 0 {
        return decode_error("FASL table indices must be >= 0", at);
    }
    Ok(n as usize)
}

/// Reads a nested value expected to decode to a `String` opcode and returns
/// its raw bytes, for opcodes (`SYMBOL`, `PACKAGE`, `SUBR`) whose payload is
/// a name rather than a value to hand back to the caller.
fn read_name<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F) -> Result<String> {
    let at = port.error_location();
    let value = fast_read(port, factory)?;
    let bytes = factory.string_bytes(&value).ok_or(()).or_else(|_| decode_error("expected string for name", at))?;
    String::from_utf8(bytes).or_else(|_| decode_error("name is not valid utf-8", at))
}

/// Walks a decoded list value, collecting its elements, and returns whatever
/// value terminated the walk (nil for a proper list). Used for `HASH`'s pair
/// list, `INSTANCE_MAP`'s slot-name list, and `INSTANCE`'s value list — none
/// of those composites need the list's cons cells to survive past this call,
/// so collecting into a `Vec` up front is simpler than threading an iterator
/// through mutation calls.
fn collect_list<F: ValueFactory>(factory: &F, mut list: F::Value) -> (Vec<F::Value>, F::Value) {
    let mut items = Vec::new();
    while factory.is_cons(&list) {
        items.push(factory.car(&list));
        list = factory.cdr(&list);
    }
    (items, list)
}

/// Reads one nested value that must not be eof, for a composite decoder that
/// is partway through its operands — a truncated stream mid-composite is
/// "incomplete `<kind>`", never a silently embedded eof sentinel.
fn read_required<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F, kind: &'static str) -> Result<F::Value> {
    let at = port.error_location();
    let value = fast_read(port, factory)?;
    if factory.is_eof(&value) {
        return decode_error(kind, at);
    }
    Ok(value)
}

/// Builds a (possibly improper) list of `len` freshly decoded elements,
/// publishing the head cons into the definition table (via `definition`)
/// before any element is decoded, so that an element referring back to the
/// list under construction — directly or through further shared structure —
/// observes a valid head rather than a dangling one. Appends incrementally
/// via `set_cdr` rather than building a `Vec` and consing backward, per
/// spec: each new tail cell is published as soon as it exists.
fn read_list_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    len: usize,
    terminal: Option<F::Value>,
    definition: Option<usize>,
) -> Result<F::Value> {
    if len == 0 {
        let value = terminal.unwrap_or_else(|| factory.nil());
        if let Some(index) = definition {
            port.define(index, value.clone());
        }
        return Ok(value);
    }

    let nil = factory.nil();
    let head = factory.make_cons(nil.clone(), nil);
    if let Some(index) = definition {
        port.define(index, head.clone());
    }

    let first = read_required(port, factory, "incomplete list")?;
    factory.set_car(&head, first);

    let mut tail = head.clone();
    for _ in 1..len {
        let elem = read_required(port, factory, "incomplete list")?;
        let nil = factory.nil();
        let cell = factory.make_cons(elem, nil);
        factory.set_cdr(&tail, cell.clone());
        tail = cell;
    }

    let final_cdr = terminal.unwrap_or_else(|| factory.nil());
    factory.set_cdr(&tail, final_cdr);
    Ok(head)
}

fn read_vector_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    len: usize,
    definition: Option<usize>,
) -> Result<F::Value> {
    let nil = factory.nil();
    let vector = factory.make_vector(len, nil);
    if let Some(index) = definition {
        port.define(index, vector.clone());
    }
    for i in 0..len {
        let elem = read_required(port, factory, "incomplete vector")?;
        factory.set_vector_elem(&vector, i, elem);
    }
    Ok(vector)
}

fn read_structure_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    definition: Option<usize>,
) -> Result<F::Value> {
    let at = port.error_location();
    let metadata = read_required(port, factory, "incomplete structure")?;
    if !factory.is_cons(&metadata) {
        return decode_error("malformed structure, bad metadata", at);
    }
    let len = read_nonneg_length(port, factory)?;
    let structure = factory.make_structure(metadata, len);
    if let Some(index) = definition {
        port.define(index, structure.clone());
    }
    for i in 0..len {
        let elem = read_required(port, factory, "incomplete structure")?;
        factory.set_structure_elem(&structure, i, elem);
    }
    Ok(structure)
}

fn read_hash_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    definition: Option<usize>,
) -> Result<F::Value> {
    let at = port.error_location();
    let shallow_flag = fast_read(port, factory)?;
    let shallow = !factory.is_false(&shallow_flag);
    let hash = factory.make_hash(shallow);
    if let Some(index) = definition {
        port.define(index, hash.clone());
    }
    let pairs = fast_read(port, factory)?;
    let (pairs, tail) = collect_list(factory, pairs);
    if !factory.is_nil(&tail) {
        return decode_error("malformed key/value", at);
    }
    for pair in pairs {
        if !factory.is_cons(&pair) {
            return decode_error("malformed key/value", at);
        }
        let key = factory.car(&pair);
        let value = factory.cdr(&pair);
        factory.hash_set(&hash, key, value);
    }
    Ok(hash)
}

fn read_instance_map_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    definition: Option<usize>,
) -> Result<F::Value> {
    let prototype = fast_read(port, factory)?;
    let instance = factory.new_instance(prototype);
    if let Some(index) = definition {
        port.define(index, instance.clone());
    }
    let slot_names = fast_read(port, factory)?;
    let (slot_names, _) = collect_list(factory, slot_names);
    for name in slot_names {
        factory.add_instance_slot(&instance, &name);
    }
    Ok(instance)
}

fn read_instance_value<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    definition: Option<usize>,
) -> Result<F::Value> {
    let base = fast_read(port, factory)?;
    let instance = factory.clone_instance(base);
    if let Some(index) = definition {
        port.define(index, instance.clone());
    }
    let values = fast_read(port, factory)?;
    let (values, _) = collect_list(factory, values);
    for (offset, value) in values.into_iter().enumerate() {
        factory.set_instance_slot_by_index(&instance, offset + 1, value);
    }
    Ok(instance)
}

fn read_symbol_value<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F, at: ErrorLocation) -> Result<F::Value> {
    let name = read_name(port, factory)?;
    let home = fast_read(port, factory)?;
    if factory.is_nil(&home) || factory.is_false(&home) {
        Ok(factory.make_uninterned_symbol(&name))
    } else if factory.is_package(&home) {
        Ok(factory.intern_symbol(&home, &name))
    } else {
        decode_error("bad home", at)
    }
}

fn read_fast_op_value<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F, arity: usize) -> Result<F::Value> {
    let opnum = read_length(port, factory)?;
    let mut args = Vec::with_capacity(arity);
    for _ in 0..arity {
        args.push(fast_read(port, factory)?);
    }
    Ok(factory.make_fast_op(opnum, &args))
}

/// Shared dispatch core for [`fast_read`] and [`fast_read_with_loader`].
/// Control opcodes (`Nop`, `Comment`, `ResetReaderDefs`) and, when `host` is
/// present, loader opcodes, are handled in this loop and never return —
/// they perform their effect and continue scanning for the next opcode,
/// keeping stack depth bounded by the nesting of the value ultimately
/// returned rather than by how many of them precede it. Everything else
/// falls through to [`decode_opcode`], which returns a value.
fn read_dispatch<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    mut host: Option<&mut dyn LoaderHost<Value = F::Value>>,
) -> Result<F::Value> {
    loop {
        let at = port.error_location();
        let mut byte = [0u8; 1];
        if port.read_raw(&mut byte)? == 0 {
            return Ok(factory.eof_object());
        }
        let opcode = Opcode::from_byte(byte[0], at)?;
        trace!("fast_read: opcode {:?} at {}", opcode, at);

        match opcode {
            Opcode::Nop => continue,
            Opcode::Comment => {
                port.skip_to_newline()?;
                continue;
            }
            Opcode::ResetReaderDefs => {
                if let Some(table) = port.fasl_defs.as_mut() {
                    table.reset();
                }
                continue;
            }
            Opcode::BeginLoadUnit | Opcode::EndLoadUnit => {
                require_host(&mut host, at)?;
                let name = fast_read(port, factory)?;
                let _ = name;
                debug!("{:?} at {}", opcode, at);
                continue;
            }
            Opcode::LoaderDefineQ => {
                require_host(&mut host, at)?;
                let symbol = fast_read(port, factory)?;
                let value = fast_read(port, factory)?;
                require_host(&mut host, at)?.globally_bind(&symbol, value)?;
                continue;
            }
            Opcode::LoaderDefineA0 => {
                let symbol = fast_read(port, factory)?;
                let proc = fast_read(port, factory)?;
                let result = require_host(&mut host, at)?.apply(&proc, &[])?;
                require_host(&mut host, at)?.globally_bind(&symbol, result)?;
                continue;
            }
            Opcode::LoaderApply0 => {
                let proc = fast_read(port, factory)?;
                let result = require_host(&mut host, at)?.apply(&proc, &[])?;
                port.loader_accum = Some(result);
                continue;
            }
            Opcode::LoaderApplyN => {
                let proc = fast_read(port, factory)?;
                let argc = read_nonneg_length(port, factory)?;
                if argc > port.loader_stack.capacity() {
                    return decode_error("loader application argc too high", at);
                }
                let args = match port.loader_stack.pop_n(argc) {
                    Some(args) => args,
                    None => return decode_error("fast-loader stack overflow/underflow", at),
                };
                let result = require_host(&mut host, at)?.apply(&proc, &args)?;
                port.loader_accum = Some(result);
                continue;
            }
            Opcode::LoaderPush => {
                require_host(&mut host, at)?;
                let value = port.loader_accum.clone().unwrap_or_else(|| factory.nil());
                port.loader_stack.push(value, at)?;
                continue;
            }
            Opcode::LoaderDrop => {
                require_host(&mut host, at)?;
                if port.loader_stack.pop().is_none() {
                    return decode_error("fast-loader stack overflow/underflow", at);
                }
                continue;
            }
            Opcode::ReaderDefinition => {
                let index = read_nonneg_length(port, factory)?;
                let value = decode_defined(port, factory, index)?;
                if host.is_some() {
                    port.loader_accum = Some(value.clone());
                }
                return Ok(value);
            }
            Opcode::ReaderReference => {
                let index = read_nonneg_length(port, factory)?;
                check_index_bound(index, MAX_TABLE_INDEX, at)?;
                let value = match port.fasl_defs.as_ref().and_then(|t| t.get(index)) {
                    Some(v) => v.clone(),
                    None => factory.nil(),
                };
                if host.is_some() {
                    port.loader_accum = Some(value.clone());
                }
                return Ok(value);
            }
            other => {
                let value = decode_opcode(port, factory, other, at, None)?;
                if host.is_some() {
                    // An ordinary value read while a loader is driving the
                    // decode becomes the new accumulator, available to a
                    // following `LOADER_PUSH`. `LOADER_DEFINEQ`/`APPLY*`'s
                    // own operand reads go through plain `fast_read` (no
                    // `host`), so they never reach this branch and never
                    // clobber it themselves.
                    port.loader_accum = Some(value.clone());
                }
                return Ok(value);
            }
        }
    }
}

/// Decodes one non-control, non-loader opcode whose bytes have already been
/// consumed from `port`. `definition`, when set, is the table index this
/// value must be published under *before* any self-referencing child is
/// decoded (see [`decode_defined`]); composite opcodes thread it through to
/// their `read_*_value` helper, atoms ignore it and are defined by the
/// caller after the fact.
fn decode_opcode<F: ValueFactory>(
    port: &mut Port<F::Value>,
    factory: &mut F,
    opcode: Opcode,
    at: ErrorLocation,
    definition: Option<usize>,
) -> Result<F::Value> {
    if let Some(width) = opcode.fixnum_width() {
        return match port.read_binary_fixnum(width, true)? {
            Some(v) => define_and_return(port, definition, factory.make_fixnum(v)),
            None => decode_error("incomplete fixnum", at),
        };
    }
    if let Some(arity) = opcode.fast_op_arity() {
        let value = read_fast_op_value(port, factory, arity)?;
        return define_and_return(port, definition, value);
    }

    match opcode {
        Opcode::Nil => define_and_return(port, definition, factory.nil()),
        Opcode::True => define_and_return(port, definition, factory.t()),
        Opcode::False => define_and_return(port, definition, factory.make_false()),
        Opcode::Eof => define_and_return(port, definition, factory.eof_object()),
        Opcode::Character => {
            let mut byte = [0u8; 1];
            if port.read_raw(&mut byte)? == 0 {
                return decode_error("incomplete character", at);
            }
            define_and_return(port, definition, factory.make_character(byte[0] as u32))
        }
        Opcode::Float => match port.read_binary_flonum()? {
            Some(v) => define_and_return(port, definition, factory.make_flonum(v)),
            None => decode_error("incomplete float", at),
        },
        Opcode::Complex => {
            let re = port.read_binary_flonum()?.ok_or(()).or_else(|_| decode_error("incomplete complex", at))?;
            let im = port.read_binary_flonum()?.ok_or(()).or_else(|_| decode_error("incomplete complex", at))?;
            define_and_return(port, definition, factory.make_complex(Complex64::new(re, im)))
        }
        Opcode::String => {
            let len = read_nonneg_length(port, factory)?;
            let mut bytes = vec![0u8; len];
            if !port.read_exact(&mut bytes)? {
                return decode_error("incomplete string", at);
            }
            define_and_return(port, definition, factory.make_string(&bytes))
        }
        Opcode::List => {
            let len = read_nonneg_length(port, factory)?;
            read_list_value(port, factory, len, None, definition)
        }
        Opcode::ListD => {
            let len = read_nonneg_length(port, factory)?;
            let tail = read_required(port, factory, "incomplete list")?;
            read_list_value(port, factory, len, Some(tail), definition)
        }
        Opcode::Vector => {
            let len = read_nonneg_length(port, factory)?;
            read_vector_value(port, factory, len, definition)
        }
        Opcode::Structure => read_structure_value(port, factory, definition),
        Opcode::StructureLayout => {
            let name = fast_read(port, factory)?;
            let layout = factory.resolve_struct_layout(&name)?;
            define_and_return(port, definition, layout)
        }
        Opcode::Hash => read_hash_value(port, factory, definition),
        Opcode::InstanceMap => read_instance_map_value(port, factory, definition),
        Opcode::Instance => read_instance_value(port, factory, definition),
        Opcode::Closure => {
            let env = read_required(port, factory, "incomplete closure")?;
            if !(factory.is_nil(&env) || factory.is_cons(&env)) {
                return decode_error("malformed closure, bad environment", at);
            }
            let code = read_required(port, factory, "incomplete closure")?;
            if !(factory.is_nil(&code) || factory.is_cons(&code)) {
                return decode_error("malformed closure, bad code", at);
            }
            let props = read_required(port, factory, "incomplete closure")?;
            if !(factory.is_nil(&props) || factory.is_cons(&props)) {
                return decode_error("malformed closure, bad property list", at);
            }
            define_and_return(port, definition, factory.make_closure(env, code, props))
        }
        Opcode::Macro => {
            let closure = fast_read(port, factory)?;
            define_and_return(port, definition, factory.make_macro(closure))
        }
        Opcode::Symbol => {
            let value = read_symbol_value(port, factory, at)?;
            define_and_return(port, definition, value)
        }
        Opcode::Package => {
            let name = read_name(port, factory)?;
            let package = factory.resolve_package(&name)?;
            define_and_return(port, definition, package)
        }
        Opcode::Subr => {
            let name = read_name(port, factory)?;
            let subr = factory.resolve_subr(&name)?;
            define_and_return(port, definition, subr)
        }
        Opcode::Nop | Opcode::Comment | Opcode::ResetReaderDefs => {
            unreachable!("handled by read_dispatch's tail loop")
        }
        Opcode::ReaderDefinition | Opcode::ReaderReference => {
            unreachable!("handled by read_dispatch directly")
        }
        other if other.is_loader_only() => decode_error("loader ops not allowed", at),
        _ => decode_error("invalid opcode", at),
    }
}

fn define_and_return<V: Clone>(port: &mut Port<V>, definition: Option<usize>, value: V) -> Result<V> {
    if let Some(index) = definition {
        port.define(index, value.clone());
    }
    Ok(value)
}

/// Decodes the value wrapped by a `READER_DEFINITION index` prefix. For the
/// composite opcodes that can participate in shared or cyclic structure
/// (`List`/`ListD`, `Vector`, `Structure`, `Hash`, `InstanceMap`, `Instance`),
/// the outer shape is allocated and published into the definition table
/// *before* its children are decoded — each `read_*_value` helper does this
/// itself via its `definition` parameter. Everything else has no children
/// capable of referring back to it, so it is decoded plainly through
/// [`decode_opcode`], which defines it only after the fact.
fn decode_defined<F: ValueFactory>(port: &mut Port<F::Value>, factory: &mut F, index: usize) -> Result<F::Value> {
    let at = port.error_location();
    check_index_bound(index, MAX_TABLE_INDEX, at)?;

    let mut byte = [0u8; 1];
    if port.read_raw(&mut byte)? == 0 {
        return decode_error("incomplete definition", at);
    }
    let opcode = Opcode::from_byte(byte[0], at)?;
    decode_opcode(port, factory, opcode, at, Some(index))
}
