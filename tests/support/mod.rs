// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal `ValueFactory`/`LoaderHost` pair used only by the integration
//! tests, standing in for a real evaluator's heap.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use num_complex::Complex64;

use fasl_core::errors::{lookup_error, ErrorLocation, Result};
use fasl_core::fasl::LoaderHost;
use fasl_core::values::ValueFactory;

pub enum Inner {
    Nil,
    True,
    False,
    Eof,
    Fixnum(i64),
    Flonum(f64),
    Complex(Complex64),
    Character(u32),
    Str(Vec<u8>),
    Symbol { home: Option<String>, name: String },
    Package(String),
    Subr(String),
    Cons(RefCell<(TestValue, TestValue)>),
    Vector(RefCell<Vec<TestValue>>),
    Structure { metadata: TestValue, elems: RefCell<Vec<TestValue>> },
    Hash { shallow: bool, pairs: RefCell<Vec<(TestValue, TestValue)>> },
    Instance { prototype: TestValue, slots: RefCell<Vec<(String, TestValue)>> },
    Closure { env: TestValue, code: TestValue, props: TestValue },
    Macro(TestValue),
    FastOp { opcode: i64, args: Vec<TestValue> },
    Proc(Rc<dyn Fn(&[TestValue]) -> TestValue>),
}

#[derive(Clone)]
pub struct TestValue(pub Rc<Inner>);

impl TestValue {
    pub fn same_identity(&self, other: &TestValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_fixnum(&self) -> Option<i64> {
        match &*self.0 {
            Inner::Fixnum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flonum(&self) -> Option<f64> {
        match &*self.0 {
            Inner::Flonum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex64> {
        match &*self.0 {
            Inner::Complex(v) => Some(*v),
            _ => None,
        }
    }

    pub fn car(&self) -> TestValue {
        match &*self.0 {
            Inner::Cons(cell) => cell.borrow().0.clone(),
            _ => panic!("car of non-cons"),
        }
    }

    pub fn cdr(&self) -> TestValue {
        match &*self.0 {
            Inner::Cons(cell) => cell.borrow().1.clone(),
            _ => panic!("cdr of non-cons"),
        }
    }

    pub fn is_cons(&self) -> bool {
        matches!(&*self.0, Inner::Cons(_))
    }

    pub fn vector_elems(&self) -> Vec<TestValue> {
        match &*self.0 {
            Inner::Vector(cell) => cell.borrow().clone(),
            _ => panic!("not a vector"),
        }
    }

    pub fn structure_elems(&self) -> Vec<TestValue> {
        match &*self.0 {
            Inner::Structure { elems, .. } => elems.borrow().clone(),
            _ => panic!("not a structure"),
        }
    }

    pub fn hash_pairs(&self) -> Vec<(TestValue, TestValue)> {
        match &*self.0 {
            Inner::Hash { pairs, .. } => pairs.borrow().clone(),
            _ => panic!("not a hash"),
        }
    }

    pub fn instance_slots(&self) -> Vec<(String, TestValue)> {
        match &*self.0 {
            Inner::Instance { slots, .. } => slots.borrow().clone(),
            _ => panic!("not an instance"),
        }
    }

    pub fn as_str_bytes(&self) -> Option<Vec<u8>> {
        match &*self.0 {
            Inner::Str(b) => Some(b.clone()),
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<(Option<String>, String)> {
        match &*self.0 {
            Inner::Symbol { home, name } => Some((home.clone(), name.clone())),
            _ => None,
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(&*self.0, Inner::False)
    }

    pub fn proc(f: impl Fn(&[TestValue]) -> TestValue + 'static) -> TestValue {
        TestValue(Rc::new(Inner::Proc(Rc::new(f))))
    }
}

#[derive(Default)]
pub struct TestFactory {
    packages: HashMap<String, TestValue>,
    subrs: HashMap<String, TestValue>,
    struct_layouts: HashMap<String, TestValue>,
}

impl TestFactory {
    pub fn register_package(&mut self, name: &str) -> TestValue {
        let package = TestValue(Rc::new(Inner::Package(name.to_string())));
        self.packages.insert(name.to_string(), package.clone());
        package
    }

    pub fn register_subr(&mut self, name: &str, value: TestValue) {
        self.subrs.insert(name.to_string(), value);
    }

    pub fn register_struct_layout(&mut self, name: &str, value: TestValue) {
        self.struct_layouts.insert(name.to_string(), value);
    }
}

impl ValueFactory for TestFactory {
    type Value = TestValue;

    fn nil(&mut self) -> TestValue {
        TestValue(Rc::new(Inner::Nil))
    }

    fn t(&mut self) -> TestValue {
        TestValue(Rc::new(Inner::True))
    }

    fn make_false(&mut self) -> TestValue {
        TestValue(Rc::new(Inner::False))
    }

    fn eof_object(&mut self) -> TestValue {
        TestValue(Rc::new(Inner::Eof))
    }

    fn make_fixnum(&mut self, value: i64) -> TestValue {
        TestValue(Rc::new(Inner::Fixnum(value)))
    }

    fn make_flonum(&mut self, value: f64) -> TestValue {
        TestValue(Rc::new(Inner::Flonum(value)))
    }

    fn make_complex(&mut self, value: Complex64) -> TestValue {
        TestValue(Rc::new(Inner::Complex(value)))
    }

    fn make_character(&mut self, code: u32) -> TestValue {
        TestValue(Rc::new(Inner::Character(code)))
    }

    fn make_string(&mut self, bytes: &[u8]) -> TestValue {
        TestValue(Rc::new(Inner::Str(bytes.to_vec())))
    }

    fn make_uninterned_symbol(&mut self, name: &str) -> TestValue {
        TestValue(Rc::new(Inner::Symbol { home: None, name: name.to_string() }))
    }

    fn intern_symbol(&mut self, package: &TestValue, name: &str) -> TestValue {
        let home = match &*package.0 {
            Inner::Package(p) => p.clone(),
            _ => panic!("intern_symbol requires a package"),
        };
        TestValue(Rc::new(Inner::Symbol { home: Some(home), name: name.to_string() }))
    }

    fn resolve_package(&mut self, name: &str) -> Result<TestValue> {
        match self.packages.get(name) {
            Some(p) => Ok(p.clone()),
            None => lookup_error("unknown package", name, ErrorLocation::default()),
        }
    }

    fn resolve_subr(&mut self, name: &str) -> Result<TestValue> {
        match self.subrs.get(name) {
            Some(s) => Ok(s.clone()),
            None => lookup_error("unknown subr", name, ErrorLocation::default()),
        }
    }

    fn make_cons(&mut self, car: TestValue, cdr: TestValue) -> TestValue {
        TestValue(Rc::new(Inner::Cons(RefCell::new((car, cdr)))))
    }

    fn set_car(&mut self, cell: &TestValue, car: TestValue) {
        match &*cell.0 {
            Inner::Cons(inner) => inner.borrow_mut().0 = car,
            _ => panic!("set_car on non-cons"),
        }
    }

    fn set_cdr(&mut self, cell: &TestValue, cdr: TestValue) {
        match &*cell.0 {
            Inner::Cons(inner) => inner.borrow_mut().1 = cdr,
            _ => panic!("set_cdr on non-cons"),
        }
    }

    fn make_vector(&mut self, len: usize, fill: TestValue) -> TestValue {
        TestValue(Rc::new(Inner::Vector(RefCell::new(vec![fill; len]))))
    }

    fn set_vector_elem(&mut self, vector: &TestValue, index: usize, value: TestValue) {
        match &*vector.0 {
            Inner::Vector(inner) => inner.borrow_mut()[index] = value,
            _ => panic!("set_vector_elem on non-vector"),
        }
    }

    fn make_structure(&mut self, metadata: TestValue, len: usize) -> TestValue {
        let nil = TestValue(Rc::new(Inner::Nil));
        TestValue(Rc::new(Inner::Structure { metadata, elems: RefCell::new(vec![nil; len]) }))
    }

    fn set_structure_elem(&mut self, structure: &TestValue, index: usize, value: TestValue) {
        match &*structure.0 {
            Inner::Structure { elems, .. } => elems.borrow_mut()[index] = value,
            _ => panic!("set_structure_elem on non-structure"),
        }
    }

    fn resolve_struct_layout(&mut self, name: &TestValue) -> Result<TestValue> {
        let key = match &*name.0 {
            Inner::Symbol { name, .. } => name.clone(),
            Inner::Str(b) => String::from_utf8_lossy(b).into_owned(),
            _ => panic!("resolve_struct_layout requires a name"),
        };
        match self.struct_layouts.get(&key) {
            Some(v) => Ok(v.clone()),
            None => lookup_error("unknown struct layout", key, ErrorLocation::default()),
        }
    }

    fn make_hash(&mut self, shallow: bool) -> TestValue {
        TestValue(Rc::new(Inner::Hash { shallow, pairs: RefCell::new(Vec::new()) }))
    }

    fn hash_set(&mut self, hash: &TestValue, key: TestValue, value: TestValue) {
        match &*hash.0 {
            Inner::Hash { pairs, .. } => pairs.borrow_mut().push((key, value)),
            _ => panic!("hash_set on non-hash"),
        }
    }

    fn new_instance(&mut self, prototype: TestValue) -> TestValue {
        TestValue(Rc::new(Inner::Instance { prototype, slots: RefCell::new(Vec::new()) }))
    }

    fn add_instance_slot(&mut self, instance: &TestValue, name: &TestValue) {
        let slot_name = match &*name.0 {
            Inner::Symbol { name, .. } => name.clone(),
            _ => panic!("add_instance_slot requires a symbol name"),
        };
        let nil = TestValue(Rc::new(Inner::Nil));
        match &*instance.0 {
            Inner::Instance { slots, .. } => slots.borrow_mut().push((slot_name, nil)),
            _ => panic!("add_instance_slot on non-instance"),
        }
    }

    fn clone_instance(&mut self, base: TestValue) -> TestValue {
        match &*base.0 {
            Inner::Instance { prototype, slots } => TestValue(Rc::new(Inner::Instance {
                prototype: prototype.clone(),
                slots: RefCell::new(slots.borrow().clone()),
            })),
            _ => panic!("clone_instance on non-instance"),
        }
    }

    fn set_instance_slot_by_index(&mut self, instance: &TestValue, index: usize, value: TestValue) {
        match &*instance.0 {
            Inner::Instance { slots, .. } => slots.borrow_mut()[index - 1].1 = value,
            _ => panic!("set_instance_slot_by_index on non-instance"),
        }
    }

    fn make_closure(&mut self, env: TestValue, code: TestValue, props: TestValue) -> TestValue {
        TestValue(Rc::new(Inner::Closure { env, code, props }))
    }

    fn make_macro(&mut self, closure: TestValue) -> TestValue {
        TestValue(Rc::new(Inner::Macro(closure)))
    }

    fn make_fast_op(&mut self, opcode: i64, args: &[TestValue]) -> TestValue {
        TestValue(Rc::new(Inner::FastOp { opcode, args: args.to_vec() }))
    }

    fn is_nil(&self, value: &TestValue) -> bool {
        matches!(&*value.0, Inner::Nil)
    }

    fn is_false(&self, value: &TestValue) -> bool {
        matches!(&*value.0, Inner::False)
    }

    fn is_eof(&self, value: &TestValue) -> bool {
        matches!(&*value.0, Inner::Eof)
    }

    fn is_cons(&self, value: &TestValue) -> bool {
        matches!(&*value.0, Inner::Cons(_))
    }

    fn is_package(&self, value: &TestValue) -> bool {
        matches!(&*value.0, Inner::Package(_))
    }

    fn car(&self, cons: &TestValue) -> TestValue {
        cons.car()
    }

    fn cdr(&self, cons: &TestValue) -> TestValue {
        cons.cdr()
    }

    fn fixnum_value(&self, value: &TestValue) -> Option<i64> {
        value.as_fixnum()
    }

    fn string_bytes(&self, value: &TestValue) -> Option<Vec<u8>> {
        value.as_str_bytes()
    }
}

#[derive(Default)]
pub struct TestHost {
    pub bindings: HashMap<String, TestValue>,
}

impl LoaderHost for TestHost {
    type Value = TestValue;

    fn apply(&mut self, proc: &TestValue, args: &[TestValue]) -> Result<TestValue> {
        match &*proc.0 {
            Inner::Proc(f) => Ok(f(args)),
            _ => lookup_error("value is not applicable", "<proc>", ErrorLocation::default()),
        }
    }

    fn globally_bind(&mut self, symbol: &TestValue, value: TestValue) -> Result<()> {
        let (home, name) = symbol.symbol_name().expect("globally_bind requires a symbol");
        let key = match home {
            Some(home) => format!("{home}::{name}"),
            None => name,
        };
        self.bindings.insert(key, value);
        Ok(())
    }
}
