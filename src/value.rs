//! The polymorphic runtime value and its per-variant operator table.
//!
//! A [`Value`] is a reference-counted, interior-mutable cell. Two handles
//! that point at the same cell are *aliases*: mutating one through
//! [`Value::assign`] is visible through the other. [`Value::deep_clone`]
//! allocates a fresh cell for the outer container while leaving any *nested*
//! value handles (array/string elements, struct fields) aliased — this one
//! rule is what makes `let b = a;` followed by `b[0] = 99;` observable
//! through `a[0]` while still giving `b` its own identity as a binding.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDecl, StructDef};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::span::Span;
use crate::types::{BuiltinKind, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    Lvalue,
    Rvalue,
}

#[derive(Debug)]
pub enum ValueData {
    Integer(i32),
    Char(u8),
    Bool(bool),
    Str(Vec<Value>),
    Array(Vec<Value>),
    Range { start: i32, end: i32, inclusive: bool },
    RangeIterator { end: i32, inclusive: bool, step: i32, current: i32, finished: bool },
    ArrayIterator { array: Value, index: usize },
    StringIterator { string: Value, index: usize },
    Sentinel,
    Nothing,
    Function(Rc<FunctionDecl>),
    BuiltinFunction(BuiltinKind),
    Struct { definition: Rc<StructDef>, members: HashMap<String, Value> },
    StructType(Rc<StructDef>),
}

struct ValueCell {
    category: ValueCategory,
    data: ValueData,
}

/// A shared handle to a runtime value. Cloning a `Value` (via the derived
/// `Clone` impl) is always an *alias* — it bumps the reference count and
/// shares storage. Use [`Value::deep_clone`] when an independent copy is
/// required.
#[derive(Clone)]
pub struct Value(Rc<RefCell<ValueCell>>);

impl Value {
    fn new(data: ValueData, category: ValueCategory) -> Value {
        Value(Rc::new(RefCell::new(ValueCell { category, data })))
    }

    pub fn integer(v: i32, category: ValueCategory) -> Value {
        Value::new(ValueData::Integer(v), category)
    }

    pub fn char(v: u8, category: ValueCategory) -> Value {
        Value::new(ValueData::Char(v), category)
    }

    pub fn boolean(v: bool, category: ValueCategory) -> Value {
        Value::new(ValueData::Bool(v), category)
    }

    pub fn string(s: &str, category: ValueCategory) -> Value {
        let chars = s.bytes().map(|b| Value::char(b, ValueCategory::Lvalue)).collect();
        Value::new(ValueData::Str(chars), category)
    }

    pub fn array(elements: Vec<Value>, category: ValueCategory) -> Value {
        Value::new(ValueData::Array(elements), category)
    }

    pub fn range(start: i32, end: i32, inclusive: bool, category: ValueCategory) -> Value {
        Value::new(ValueData::Range { start, end, inclusive }, category)
    }

    pub fn nothing() -> Value {
        Value::new(ValueData::Nothing, ValueCategory::Rvalue)
    }

    pub fn sentinel() -> Value {
        Value::new(ValueData::Sentinel, ValueCategory::Rvalue)
    }

    pub fn function(decl: Rc<FunctionDecl>, category: ValueCategory) -> Value {
        Value::new(ValueData::Function(decl), category)
    }

    pub fn builtin(kind: BuiltinKind, category: ValueCategory) -> Value {
        Value::new(ValueData::BuiltinFunction(kind), category)
    }

    pub fn struct_type(def: Rc<StructDef>, category: ValueCategory) -> Value {
        Value::new(ValueData::StructType(def), category)
    }

    pub fn struct_instance(def: Rc<StructDef>, members: HashMap<String, Value>, category: ValueCategory) -> Value {
        Value::new(ValueData::Struct { definition: def, members }, category)
    }

    pub fn is_lvalue(&self) -> bool {
        self.0.borrow().category == ValueCategory::Lvalue
    }

    pub fn is_rvalue(&self) -> bool {
        self.0.borrow().category == ValueCategory::Rvalue
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.0.borrow().data, ValueData::Sentinel)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.0.borrow().data {
            ValueData::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_function_decl(&self) -> Option<Rc<FunctionDecl>> {
        match &self.0.borrow().data {
            ValueData::Function(f) => Some(Rc::clone(f)),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.0.borrow().data {
            ValueData::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<u8> {
        match self.0.borrow().data {
            ValueData::Char(v) => Some(v),
            _ => None,
        }
    }

    /// Removes the element at `index` from an `Array` or `String` in place.
    /// Requires `self` to be an lvalue (checked by the caller).
    pub fn delete_at(&self, index: i32, span: Span) -> Result<(), RuntimeError> {
        let mut cell = self.0.borrow_mut();
        let len = match &cell.data {
            ValueData::Array(elems) => elems.len(),
            ValueData::Str(elems) => elems.len(),
            _ => {
                drop(cell);
                let type_name = self.type_name();
                return Err(RuntimeError::operation_not_supported("delete", &[&type_name], span));
            }
        };
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::new(RuntimeErrorKind::IndexOutOfBounds { index, size: len }, span));
        }
        match &mut cell.data {
            ValueData::Array(elems) => {
                elems.remove(index as usize);
            }
            ValueData::Str(elems) => {
                elems.remove(index as usize);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    /// Mutates this handle's category to `Lvalue` in place. Because the
    /// handle is shared, every alias observes the promotion.
    pub fn promote_to_lvalue(&self) {
        self.0.borrow_mut().category = ValueCategory::Lvalue;
    }

    /// Produces a fresh, independent copy of the *outer* value. Containers
    /// copy their spine but keep their elements' handles aliased (see the
    /// module docs); scalars are genuinely independent since the clone
    /// allocates a brand new cell holding a plain copy of the scalar.
    pub fn deep_clone(&self) -> Value {
        let cell = self.0.borrow();
        let data = match &cell.data {
            ValueData::Integer(v) => ValueData::Integer(*v),
            ValueData::Char(v) => ValueData::Char(*v),
            ValueData::Bool(v) => ValueData::Bool(*v),
            ValueData::Str(elems) => ValueData::Str(elems.clone()),
            ValueData::Array(elems) => ValueData::Array(elems.clone()),
            ValueData::Range { start, end, inclusive } => {
                ValueData::Range { start: *start, end: *end, inclusive: *inclusive }
            }
            ValueData::RangeIterator { end, inclusive, step, current, finished } => ValueData::RangeIterator {
                end: *end,
                inclusive: *inclusive,
                step: *step,
                current: *current,
                finished: *finished,
            },
            ValueData::ArrayIterator { array, index } => {
                ValueData::ArrayIterator { array: array.clone(), index: *index }
            }
            ValueData::StringIterator { string, index } => {
                ValueData::StringIterator { string: string.clone(), index: *index }
            }
            ValueData::Sentinel => ValueData::Sentinel,
            ValueData::Nothing => ValueData::Nothing,
            ValueData::Function(f) => ValueData::Function(Rc::clone(f)),
            ValueData::BuiltinFunction(b) => ValueData::BuiltinFunction(*b),
            ValueData::Struct { definition, members } => {
                ValueData::Struct { definition: Rc::clone(definition), members: members.clone() }
            }
            ValueData::StructType(d) => ValueData::StructType(Rc::clone(d)),
        };
        Value::new(data, cell.category)
    }

    /// A fresh rvalue copy: `deep_clone` followed by resetting the category.
    pub fn as_rvalue(&self) -> Value {
        let clone = self.deep_clone();
        clone.0.borrow_mut().category = ValueCategory::Rvalue;
        clone
    }

    pub fn type_of(&self) -> Type {
        match &self.0.borrow().data {
            ValueData::Integer(_) => Type::I32,
            ValueData::Char(_) => Type::Char,
            ValueData::Bool(_) => Type::Bool,
            ValueData::Str(_) => Type::String,
            ValueData::Array(elems) => {
                if let Some(first) = elems.first() {
                    Type::Array(Box::new(first.type_of()))
                } else {
                    Type::Array(Box::new(Type::Unspecified))
                }
            }
            ValueData::Range { .. } => Type::Range,
            ValueData::RangeIterator { .. } => Type::RangeIterator,
            ValueData::ArrayIterator { array, .. } => {
                let Type::Array(inner) = array.type_of() else { unreachable!() };
                Type::ArrayIterator(inner)
            }
            ValueData::StringIterator { .. } => Type::StringIterator,
            ValueData::Sentinel => Type::Sentinel,
            ValueData::Nothing => Type::Nothing,
            ValueData::Function(f) => {
                Type::Function(f.params.iter().map(|p| p.ty.clone()).collect(), Box::new(f.return_type.clone()))
            }
            ValueData::BuiltinFunction(kind) => Type::BuiltinFunction(*kind),
            ValueData::Struct { definition, .. } => Type::StructType(Rc::clone(definition)),
            ValueData::StructType(d) => Type::StructType(Rc::clone(d)),
        }
    }

    pub fn type_name(&self) -> String {
        self.type_of().to_string()
    }

    pub fn string_representation(&self) -> String {
        match &self.0.borrow().data {
            ValueData::Integer(v) => v.to_string(),
            ValueData::Char(v) => (*v as char).to_string(),
            ValueData::Bool(v) => v.to_string(),
            ValueData::Str(chars) => chars.iter().map(|c| c.string_representation()).collect(),
            ValueData::Array(elems) => {
                let parts: Vec<String> = elems.iter().map(|e| e.string_representation()).collect();
                format!("[{}]", parts.join(", "))
            }
            ValueData::Range { start, end, inclusive } => {
                format!("{}..{}{}", start, if *inclusive { "=" } else { "" }, end)
            }
            ValueData::RangeIterator { .. } => "RangeIterator".to_string(),
            ValueData::ArrayIterator { .. } => "ArrayIterator".to_string(),
            ValueData::StringIterator { .. } => "StringIterator".to_string(),
            ValueData::Sentinel => "Sentinel".to_string(),
            ValueData::Nothing => "nothing".to_string(),
            ValueData::Function(f) => format!("Function({})", f.name),
            ValueData::BuiltinFunction(kind) => format!("BuiltinFunction({})", kind.name()),
            ValueData::Struct { definition, members } => {
                let parts: Vec<String> = definition
                    .members
                    .iter()
                    .map(|(name, _)| format!("{}: {}", name, members[name].string_representation()))
                    .collect();
                format!("{} {{ {} }}", definition.name, parts.join(", "))
            }
            ValueData::StructType(d) => d.name.clone(),
        }
    }

    fn unsupported(&self, op: &str, other: Option<&Value>, span: Span) -> RuntimeError {
        let mut types = vec![self.type_name()];
        if let Some(other) = other {
            types.push(other.type_name());
        }
        RuntimeError::operation_not_supported(op, &types.iter().map(String::as_str).collect::<Vec<_>>(), span)
    }

    pub fn unary_plus(&self, span: Span) -> Result<Value, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Integer(v) => Ok(Value::integer(*v, ValueCategory::Rvalue)),
            _ => Err(self.unsupported("unary_plus", None, span)),
        }
    }

    pub fn unary_minus(&self, span: Span) -> Result<Value, RuntimeError> {
        match &self.0.borrow().data {
            ValueData::Integer(v) => Ok(Value::integer(v.wrapping_neg(), ValueCategory::Rvalue)),
            _ => Err(self.unsupported("unary_minus", None, span)),
        }
    }

    pub fn add(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        match &lhs.data {
            ValueData::Integer(v) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(w) => Ok(Value::integer(v.wrapping_add(*w), ValueCategory::Rvalue)),
                    ValueData::Str(_) => {
                        drop(rhs);
                        Ok(Value::string(
                            &format!("{}{}", v, other.string_representation()),
                            ValueCategory::Rvalue,
                        ))
                    }
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("binary_plus", Some(other), span))
                    }
                }
            }
            ValueData::Char(c) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(shift) => {
                        Ok(Value::char((*c as i32).wrapping_add(*shift) as u8, ValueCategory::Rvalue))
                    }
                    ValueData::Str(_) => {
                        drop(rhs);
                        Ok(Value::string(
                            &format!("{}{}", *c as char, other.string_representation()),
                            ValueCategory::Rvalue,
                        ))
                    }
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("binary_plus", Some(other), span))
                    }
                }
            }
            ValueData::Str(_) => Ok(Value::string(
                &format!("{}{}", self.string_representation(), other.string_representation()),
                ValueCategory::Rvalue,
            )),
            ValueData::Bool(_) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Str(_) => {
                        drop(rhs);
                        Ok(Value::string(
                            &format!("{}{}", self.string_representation(), other.string_representation()),
                            ValueCategory::Rvalue,
                        ))
                    }
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("binary_plus", Some(other), span))
                    }
                }
            }
            ValueData::Array(elems) => {
                let rhs = other.0.borrow();
                let ValueData::Array(other_elems) = &rhs.data else {
                    drop(rhs);
                    drop(lhs);
                    return Err(self.unsupported("binary_plus", Some(other), span));
                };
                if elems.is_empty() {
                    return Ok(other.as_rvalue());
                }
                if other_elems.is_empty() {
                    return Ok(self.as_rvalue());
                }
                if self.type_of() != other.type_of() {
                    drop(rhs);
                    drop(lhs);
                    return Err(self.unsupported("binary_plus", Some(other), span));
                }
                let mut combined: Vec<Value> =
                    elems.iter().map(|v| v.deep_clone()).collect();
                combined.extend(other_elems.iter().map(|v| v.deep_clone()));
                Ok(Value::array(combined, ValueCategory::Rvalue))
            }
            _ => {
                drop(lhs);
                Err(self.unsupported("binary_plus", Some(other), span))
            }
        }
    }

    pub fn sub(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        match &lhs.data {
            ValueData::Integer(v) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(w) => Ok(Value::integer(v.wrapping_sub(*w), ValueCategory::Rvalue)),
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("binary_minus", Some(other), span))
                    }
                }
            }
            ValueData::Char(c) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Char(d) => Ok(Value::integer((*c as i32) - (*d as i32), ValueCategory::Rvalue)),
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("binary_minus", Some(other), span))
                    }
                }
            }
            _ => {
                drop(lhs);
                Err(self.unsupported("binary_minus", Some(other), span))
            }
        }
    }

    pub fn multiply(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        match &lhs.data {
            ValueData::Integer(n) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(m) => Ok(Value::integer(n.wrapping_mul(*m), ValueCategory::Rvalue)),
                    ValueData::Str(_) => {
                        drop(rhs);
                        drop(lhs);
                        Ok(Value::string(&repeat_string(&other.string_representation(), *n), ValueCategory::Rvalue))
                    }
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("multiply", Some(other), span))
                    }
                }
            }
            ValueData::Str(_) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(n) => {
                        let n = *n;
                        drop(rhs);
                        let text = self.string_representation();
                        drop(lhs);
                        Ok(Value::string(&repeat_string(&text, n), ValueCategory::Rvalue))
                    }
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("multiply", Some(other), span))
                    }
                }
            }
            _ => {
                drop(lhs);
                Err(self.unsupported("multiply", Some(other), span))
            }
        }
    }

    pub fn divide(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        match &lhs.data {
            ValueData::Integer(n) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(0) => Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span)),
                    ValueData::Integer(m) => Ok(Value::integer(n.wrapping_div(*m), ValueCategory::Rvalue)),
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("divide", Some(other), span))
                    }
                }
            }
            _ => {
                drop(lhs);
                Err(self.unsupported("divide", Some(other), span))
            }
        }
    }

    pub fn modulo(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        match &lhs.data {
            ValueData::Integer(n) => {
                let rhs = other.0.borrow();
                match &rhs.data {
                    ValueData::Integer(0) => Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, span)),
                    ValueData::Integer(m) => Ok(Value::integer(n.wrapping_rem(*m), ValueCategory::Rvalue)),
                    _ => {
                        drop(rhs);
                        drop(lhs);
                        Err(self.unsupported("mod", Some(other), span))
                    }
                }
            }
            _ => {
                drop(lhs);
                Err(self.unsupported("mod", Some(other), span))
            }
        }
    }

    fn compare(&self, other: &Value, span: Span, op: &str) -> Result<std::cmp::Ordering, RuntimeError> {
        let lhs = self.0.borrow();
        let rhs = other.0.borrow();
        match (&lhs.data, &rhs.data) {
            (ValueData::Integer(a), ValueData::Integer(b)) => Ok(a.cmp(b)),
            (ValueData::Char(a), ValueData::Char(b)) => Ok(a.cmp(b)),
            _ => {
                drop(rhs);
                drop(lhs);
                Err(self.unsupported(op, Some(other), span))
            }
        }
    }

    pub fn less_than(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        Ok(Value::boolean(self.compare(other, span, "less_than")?.is_lt(), ValueCategory::Rvalue))
    }

    pub fn less_equal(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        Ok(Value::boolean(self.compare(other, span, "less_or_equals")?.is_le(), ValueCategory::Rvalue))
    }

    pub fn greater_than(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        Ok(Value::boolean(self.compare(other, span, "greater_than")?.is_gt(), ValueCategory::Rvalue))
    }

    pub fn greater_equal(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        Ok(Value::boolean(self.compare(other, span, "greater_or_equals")?.is_ge(), ValueCategory::Rvalue))
    }

    pub fn equals(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        let rhs = other.0.borrow();
        let result = match (&lhs.data, &rhs.data) {
            (ValueData::Integer(a), ValueData::Integer(b)) => a == b,
            (ValueData::Char(a), ValueData::Char(b)) => a == b,
            (ValueData::Bool(a), ValueData::Bool(b)) => a == b,
            (ValueData::Str(a), ValueData::Str(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
            }
            (ValueData::Array(a), ValueData::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
            }
            (ValueData::Struct { definition: da, members: ma }, ValueData::Struct { definition: db, members: mb }) => {
                if !Rc::ptr_eq(da, db) {
                    drop(rhs);
                    drop(lhs);
                    return Err(self.unsupported("equals", Some(other), span));
                }
                ma.iter().all(|(k, v)| mb.get(k).is_some_and(|w| values_equal(v, w)))
            }
            _ => {
                drop(rhs);
                drop(lhs);
                return Err(self.unsupported("equals", Some(other), span));
            }
        };
        Ok(Value::boolean(result, ValueCategory::Rvalue))
    }

    pub fn not_equals(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let eq = self.equals(other, span)?;
        let ValueData::Bool(b) = eq.0.borrow().data else { unreachable!() };
        Ok(Value::boolean(!b, ValueCategory::Rvalue))
    }

    pub fn logical_and(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        let ValueData::Bool(a) = lhs.data else {
            drop(lhs);
            return Err(self.unsupported("logical_and", Some(other), span));
        };
        drop(lhs);
        let rhs = other.0.borrow();
        let ValueData::Bool(b) = rhs.data else {
            drop(rhs);
            return Err(self.unsupported("logical_and", Some(other), span));
        };
        Ok(Value::boolean(a && b, ValueCategory::Rvalue))
    }

    pub fn logical_or(&self, other: &Value, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        let ValueData::Bool(a) = lhs.data else {
            drop(lhs);
            return Err(self.unsupported("logical_or", Some(other), span));
        };
        drop(lhs);
        let rhs = other.0.borrow();
        let ValueData::Bool(b) = rhs.data else {
            drop(rhs);
            return Err(self.unsupported("logical_or", Some(other), span));
        };
        Ok(Value::boolean(a || b, ValueCategory::Rvalue))
    }

    pub fn make_range(&self, other: &Value, inclusive: bool, span: Span) -> Result<Value, RuntimeError> {
        let lhs = self.0.borrow();
        let rhs = other.0.borrow();
        match (&lhs.data, &rhs.data) {
            (ValueData::Integer(a), ValueData::Integer(b)) => {
                Ok(Value::range(*a, *b, inclusive, ValueCategory::Rvalue))
            }
            _ => {
                drop(rhs);
                drop(lhs);
                Err(self.unsupported("range", Some(other), span))
            }
        }
    }

    pub fn subscript(&self, index: &Value, span: Span) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        let elements = match &cell.data {
            ValueData::Array(elems) => elems,
            ValueData::Str(elems) => elems,
            _ => {
                drop(cell);
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UnableToSubscript {
                        index_type: index.type_name(),
                        base_type: self.type_name(),
                    },
                    span,
                ));
            }
        };
        let idx_cell = index.0.borrow();
        let ValueData::Integer(i) = idx_cell.data else {
            drop(idx_cell);
            drop(cell);
            return Err(RuntimeError::new(
                RuntimeErrorKind::UnableToSubscript { index_type: index.type_name(), base_type: self.type_name() },
                span,
            ));
        };
        if i < 0 || i as usize >= elements.len() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::IndexOutOfBounds { index: i, size: elements.len() },
                span,
            ));
        }
        Ok(elements[i as usize].clone())
    }

    pub fn assign(&self, other: &Value, span: Span) -> Result<(), RuntimeError> {
        if !self.is_lvalue() {
            return Err(RuntimeError::new(RuntimeErrorKind::LvalueRequired, span));
        }
        // Computed up front: `cell` below holds a mutable borrow of `self.0`
        // for the rest of this call, and `type_name()` would panic if it
        // tried to re-borrow `self.0` immutably while that's alive.
        let self_type = self.type_name();
        let other_type = other.type_name();
        let mismatch = || RuntimeError::operation_not_supported("assignment", &[&self_type, &other_type], span.clone());

        let mut cell = self.0.borrow_mut();
        match &mut cell.data {
            ValueData::Integer(v) => {
                let ValueData::Integer(w) = other.0.borrow().data else {
                    return Err(mismatch());
                };
                *v = w;
            }
            ValueData::Char(v) => {
                let ValueData::Char(w) = other.0.borrow().data else {
                    return Err(mismatch());
                };
                *v = w;
            }
            ValueData::Bool(v) => {
                let ValueData::Bool(w) = other.0.borrow().data else {
                    return Err(mismatch());
                };
                *v = w;
            }
            ValueData::Str(elems) => {
                let other_cell = other.0.borrow();
                let ValueData::Str(other_elems) = &other_cell.data else {
                    drop(other_cell);
                    return Err(mismatch());
                };
                *elems = other_elems.iter().map(|e| e.deep_clone()).collect();
            }
            ValueData::Array(elems) => {
                let other_cell = other.0.borrow();
                let ValueData::Array(other_elems) = &other_cell.data else {
                    drop(other_cell);
                    return Err(mismatch());
                };
                if !other_elems.is_empty() {
                    *elems = other_elems.iter().map(|e| e.deep_clone()).collect();
                }
            }
            ValueData::Struct { definition, members } => {
                let other_cell = other.0.borrow();
                let ValueData::Struct { definition: other_def, members: other_members } = &other_cell.data else {
                    drop(other_cell);
                    return Err(mismatch());
                };
                if !Rc::ptr_eq(definition, other_def) {
                    drop(other_cell);
                    return Err(mismatch());
                }
                *members = other_members.iter().map(|(k, v)| (k.clone(), v.deep_clone())).collect();
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    pub fn iterator(&self, span: Span) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        match &cell.data {
            ValueData::Range { start, end, inclusive } => {
                let step = if *start <= *end { 1 } else { -1 };
                Ok(Value::new(
                    ValueData::RangeIterator {
                        end: *end,
                        inclusive: *inclusive,
                        step,
                        current: *start,
                        finished: false,
                    },
                    ValueCategory::Rvalue,
                ))
            }
            ValueData::Array(_) => Ok(Value::new(
                ValueData::ArrayIterator { array: self.clone(), index: 0 },
                ValueCategory::Rvalue,
            )),
            ValueData::Str(_) => Ok(Value::new(
                ValueData::StringIterator { string: self.clone(), index: 0 },
                ValueCategory::Rvalue,
            )),
            _ => {
                drop(cell);
                Err(self.unsupported("iterator", None, span))
            }
        }
    }

    pub fn next(&self) -> Value {
        let mut cell = self.0.borrow_mut();
        match &mut cell.data {
            ValueData::RangeIterator { end, inclusive, step, current, finished } => {
                if *finished {
                    return Value::sentinel();
                }
                let in_bounds =
                    if *step == 1 { if *inclusive { *current <= *end } else { *current < *end } }
                    else if *inclusive { *current >= *end } else { *current > *end };
                if !in_bounds {
                    *finished = true;
                    return Value::sentinel();
                }
                let result = *current;
                *current += *step;
                Value::integer(result, ValueCategory::Rvalue)
            }
            ValueData::ArrayIterator { array, index } => {
                let array_cell = array.0.borrow();
                let ValueData::Array(elems) = &array_cell.data else { unreachable!() };
                if *index >= elems.len() {
                    return Value::sentinel();
                }
                let value = elems[*index].clone();
                *index += 1;
                value
            }
            ValueData::StringIterator { string, index } => {
                let string_cell = string.0.borrow();
                let ValueData::Str(elems) = &string_cell.data else { unreachable!() };
                if *index >= elems.len() {
                    return Value::sentinel();
                }
                let value = elems[*index].clone();
                *index += 1;
                value
            }
            _ => Value::sentinel(),
        }
    }

    pub fn member_access(&self, name: &str, span: Span) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        match &cell.data {
            ValueData::Array(elems) if name == "size" => {
                Ok(Value::integer(elems.len() as i32, ValueCategory::Rvalue))
            }
            ValueData::Str(elems) if name == "size" || name == "length" => {
                Ok(Value::integer(elems.len() as i32, ValueCategory::Rvalue))
            }
            ValueData::Struct { members, .. } => members.get(name).cloned().ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::NoSuchMember { member: name.to_string(), type_name: self.type_name() },
                    span,
                )
            }),
            _ => {
                let type_name = self.type_name();
                drop(cell);
                Err(RuntimeError::new(RuntimeErrorKind::NoSuchMember { member: name.to_string(), type_name }, span))
            }
        }
    }

    pub fn cast(&self, target: &Type, span: Span) -> Result<Value, RuntimeError> {
        let cell = self.0.borrow();
        match (&cell.data, target) {
            (ValueData::Integer(v), Type::Char) => Ok(Value::char(*v as u8, ValueCategory::Rvalue)),
            (ValueData::Integer(v), Type::Bool) => Ok(Value::boolean(*v != 0, ValueCategory::Rvalue)),
            (ValueData::Integer(v), Type::String) => Ok(Value::string(&v.to_string(), ValueCategory::Rvalue)),
            (ValueData::Integer(v), Type::I32) => Ok(Value::integer(*v, ValueCategory::Rvalue)),
            (ValueData::Str(_), Type::I32) => {
                let text = self.string_representation();
                drop(cell);
                text.trim().parse::<i32>().map(|v| Value::integer(v, ValueCategory::Rvalue)).map_err(|_| {
                    RuntimeError::new(RuntimeErrorKind::InvalidIntegerValue { text }, span)
                })
            }
            _ => {
                let from = self.type_name();
                drop(cell);
                Err(RuntimeError::new(
                    RuntimeErrorKind::CastError { target: target.to_string(), from },
                    span,
                ))
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a.equals(b, Span::dummy()).map(|v| matches!(v.0.borrow().data, ValueData::Bool(true))).unwrap_or(false)
}

fn repeat_string(s: &str, n: i32) -> String {
    if n <= 0 {
        String::new()
    } else {
        s.repeat(n as usize)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.string_representation())
    }
}
