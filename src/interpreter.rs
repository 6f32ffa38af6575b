//! Statement execution and expression evaluation.
//!
//! Control flow (`break`/`continue`/`return`) is threaded as an explicit
//! [`Signal`] rather than unwound via Rust panics — see the module docs on
//! [`crate::error::Signal`]. Every construct that can catch a signal (block,
//! loop body, function call) is responsible for restoring the scope stack to
//! its pre-entry depth on every exit path, matching the scope-depth
//! invariant the language guarantees.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{AssignOpKind, BinaryOpKind, Expr, ExprKind, Stmt, StmtKind, StructDef, UnaryOpKind};
use crate::builtins;
use crate::error::{RuntimeError, RuntimeErrorKind, Signal};
use crate::scope::ScopeStack;
use crate::span::Span;
use crate::types::{BuiltinKind, Type};
use crate::value::{Value, ValueCategory};

pub struct Interpreter<W: Write> {
    scopes: ScopeStack,
    pub stdout: W,
}

type EResult<T> = Result<T, Signal>;

impl<W: Write> Interpreter<W> {
    pub fn new(stdout: W) -> Self {
        let mut scopes = ScopeStack::new();
        for kind in [
            BuiltinKind::Split,
            BuiltinKind::Join,
            BuiltinKind::Delete,
            BuiltinKind::Read,
            BuiltinKind::Write,
            BuiltinKind::Trim,
        ] {
            scopes.define(kind.name(), Value::builtin(kind, ValueCategory::Lvalue));
        }
        Self { scopes, stdout }
    }

    pub fn run(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in program {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Signal::Error(e)) => return Err(e),
                Err(Signal::Break(span)) => {
                    return Err(RuntimeError::new(RuntimeErrorKind::DanglingControlFlow { keyword: "break" }, span))
                }
                Err(Signal::Continue(span)) => {
                    return Err(RuntimeError::new(RuntimeErrorKind::DanglingControlFlow { keyword: "continue" }, span))
                }
                Err(Signal::Return(span, _)) => {
                    return Err(RuntimeError::new(RuntimeErrorKind::DanglingControlFlow { keyword: "return" }, span))
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> EResult<()> {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.execute_block(stmts),
            StmtKind::Expression(expr) => {
                self.eval(expr)?;
                Ok(())
            }
            StmtKind::Print(expr) => {
                if let Some(expr) = expr {
                    let value = self.eval(expr)?;
                    write!(self.stdout, "{}", value.string_representation())
                        .map_err(|e| io_error(e, stmt.span.clone()))?;
                }
                Ok(())
            }
            StmtKind::Println(expr) => {
                if let Some(expr) = expr {
                    let value = self.eval(expr)?;
                    write!(self.stdout, "{}", value.string_representation())
                        .map_err(|e| io_error(e, stmt.span.clone()))?;
                }
                writeln!(self.stdout).map_err(|e| io_error(e, stmt.span.clone()))?;
                Ok(())
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let cond_value = self.eval(cond)?;
                self.require_bool(&cond_value, cond.span.clone())?;
                if is_true(&cond_value) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            StmtKind::While { cond, body } => {
                loop {
                    let cond_value = self.eval(cond)?;
                    self.require_bool(&cond_value, cond.span.clone())?;
                    if !is_true(&cond_value) {
                        break;
                    }
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Signal::Break(_)) => break,
                        Err(Signal::Continue(_)) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            StmtKind::For { var, iterable, body } => {
                let iterable_value = self.eval(iterable)?;
                let iterator = iterable_value.iterator(iterable.span.clone()).map_err(Signal::Error)?;
                loop {
                    let item = iterator.next();
                    if item.is_sentinel() {
                        break;
                    }
                    let depth = self.scopes.depth();
                    self.scopes.push_scope();
                    if var != "_" {
                        self.scopes.define(var, item);
                    }
                    let result = self.execute(body);
                    self.scopes.truncate_to(depth);
                    match result {
                        Ok(()) => {}
                        Err(Signal::Break(_)) => break,
                        Err(Signal::Continue(_)) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            StmtKind::Break => Err(Signal::Break(stmt.span.clone())),
            StmtKind::Continue => Err(Signal::Continue(stmt.span.clone())),
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::nothing(),
                };
                Err(Signal::Return(stmt.span.clone(), value))
            }
            StmtKind::VariableDefinition { name, init } => {
                let evaluated = self.eval(init)?;
                let bound = if evaluated.is_rvalue() {
                    evaluated.promote_to_lvalue();
                    evaluated
                } else {
                    let clone = evaluated.deep_clone();
                    clone.promote_to_lvalue();
                    clone
                };
                if name != "_" && !self.scopes.define(name, bound) {
                    return Err(Signal::Error(RuntimeError::new(
                        RuntimeErrorKind::SymbolRedefinition { name: name.clone() },
                        stmt.span.clone(),
                    )));
                }
                Ok(())
            }
            StmtKind::Assignment { target, op, value } => {
                let lhs = self.eval(target)?;
                let rhs = self.eval(value)?;
                let new_value = match op {
                    AssignOpKind::Assign => rhs,
                    AssignOpKind::AddAssign => lhs.add(&rhs, stmt.span.clone()).map_err(Signal::Error)?,
                    AssignOpKind::SubAssign => lhs.sub(&rhs, stmt.span.clone()).map_err(Signal::Error)?,
                    AssignOpKind::MulAssign => lhs.multiply(&rhs, stmt.span.clone()).map_err(Signal::Error)?,
                    AssignOpKind::DivAssign => lhs.divide(&rhs, stmt.span.clone()).map_err(Signal::Error)?,
                };
                lhs.assign(&new_value, stmt.span.clone()).map_err(Signal::Error)?;
                Ok(())
            }
            StmtKind::Assert(expr) => {
                let value = self.eval(expr)?;
                self.require_bool(&value, expr.span.clone())?;
                if !is_true(&value) {
                    return Err(Signal::Error(RuntimeError::new(
                        RuntimeErrorKind::FailedAssertion { text: expr.span.text().to_string() },
                        stmt.span.clone(),
                    )));
                }
                Ok(())
            }
            StmtKind::FunctionDeclaration(decl) => {
                let value = Value::function(Rc::clone(decl), ValueCategory::Lvalue);
                if !self.scopes.define(&decl.name, value) {
                    return Err(Signal::Error(RuntimeError::new(
                        RuntimeErrorKind::SymbolRedefinition { name: decl.name.clone() },
                        stmt.span.clone(),
                    )));
                }
                Ok(())
            }
            StmtKind::StructDefinition(def) => {
                let value = Value::struct_type(Rc::clone(def), ValueCategory::Lvalue);
                if !self.scopes.define(&def.name, value) {
                    return Err(Signal::Error(RuntimeError::new(
                        RuntimeErrorKind::SymbolRedefinition { name: def.name.clone() },
                        stmt.span.clone(),
                    )));
                }
                Ok(())
            }
        }
    }

    fn execute_block(&mut self, stmts: &[Stmt]) -> EResult<()> {
        let depth = self.scopes.depth();
        self.scopes.push_scope();
        let result = (|| {
            for stmt in stmts {
                self.execute(stmt)?;
            }
            Ok(())
        })();
        self.scopes.truncate_to(depth);
        result
    }

    fn require_bool(&self, value: &Value, span: Span) -> EResult<()> {
        if matches!(value.type_of(), Type::Bool) {
            Ok(())
        } else {
            Err(Signal::Error(RuntimeError::type_mismatch(&Type::Bool, &value.type_of(), span)))
        }
    }

    fn eval(&mut self, expr: &Expr) -> EResult<Value> {
        match &expr.kind {
            ExprKind::IntegerLiteral(v) => Ok(Value::integer(*v, ValueCategory::Rvalue)),
            ExprKind::StringLiteral(s) => Ok(Value::string(s, ValueCategory::Rvalue)),
            ExprKind::CharLiteral(c) => Ok(Value::char(*c, ValueCategory::Rvalue)),
            ExprKind::BoolLiteral(b) => Ok(Value::boolean(*b, ValueCategory::Rvalue)),
            ExprKind::ArrayLiteral(elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for e in elems {
                    let v = self.eval(e)?;
                    if v.is_rvalue() {
                        v.promote_to_lvalue();
                        values.push(v);
                    } else {
                        values.push(v.deep_clone());
                    }
                }
                Ok(Value::array(values, ValueCategory::Rvalue))
            }
            ExprKind::Name(name) => self
                .scopes
                .lookup(name)
                .cloned()
                .ok_or_else(|| Signal::Error(RuntimeError::new(
                    RuntimeErrorKind::UndefinedReference { name: name.clone() },
                    expr.span.clone(),
                ))),
            ExprKind::UnaryOp(op, operand) => {
                let v = self.eval(operand)?;
                let result = match op {
                    UnaryOpKind::Plus => v.unary_plus(expr.span.clone()),
                    UnaryOpKind::Minus => v.unary_minus(expr.span.clone()),
                };
                result.map_err(Signal::Error)
            }
            ExprKind::BinaryOp(op, lhs, rhs) => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                let span = expr.span.clone();
                let result = match op {
                    BinaryOpKind::Add => l.add(&r, span),
                    BinaryOpKind::Sub => l.sub(&r, span),
                    BinaryOpKind::Mul => l.multiply(&r, span),
                    BinaryOpKind::Div => l.divide(&r, span),
                    BinaryOpKind::Mod => l.modulo(&r, span),
                    BinaryOpKind::Eq => l.equals(&r, span),
                    BinaryOpKind::NotEq => l.not_equals(&r, span),
                    BinaryOpKind::Less => l.less_than(&r, span),
                    BinaryOpKind::LessEq => l.less_equal(&r, span),
                    BinaryOpKind::Greater => l.greater_than(&r, span),
                    BinaryOpKind::GreaterEq => l.greater_equal(&r, span),
                    BinaryOpKind::And => l.logical_and(&r, span),
                    BinaryOpKind::Or => l.logical_or(&r, span),
                };
                result.map_err(Signal::Error)
            }
            ExprKind::Range { start, end, inclusive } => {
                let s = self.eval(start)?;
                let e = self.eval(end)?;
                s.make_range(&e, *inclusive, expr.span.clone()).map_err(Signal::Error)
            }
            ExprKind::Subscript(base, index) => {
                let base_value = self.eval(base)?;
                let index_value = self.eval(index)?;
                base_value.subscript(&index_value, expr.span.clone()).map_err(Signal::Error)
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.eval(callee)?;
                self.call(&callee_value, args, expr.span.clone())
            }
            ExprKind::StructLiteral { name, initializers } => self.eval_struct_literal(name, initializers, expr.span.clone()),
            ExprKind::MemberAccess(base, name) => {
                let base_value = self.eval(base)?;
                base_value.member_access(name, expr.span.clone()).map_err(Signal::Error)
            }
            ExprKind::Cast(inner, ty) => {
                let v = self.eval(inner)?;
                let ty = self.resolve_type(ty);
                v.cast(&ty, expr.span.clone()).map_err(Signal::Error)
            }
            ExprKind::TypeOf(inner) => {
                let v = self.eval(inner)?;
                Ok(Value::string(&v.type_name(), ValueCategory::Rvalue))
            }
        }
    }

    /// Re-resolves a `StructType` annotation against the current scope so
    /// that struct-typed parameters compare correctly against the genuine
    /// definition installed by the matching `struct` statement.
    fn resolve_type(&self, ty: &Type) -> Type {
        match ty {
            Type::StructType(def) => match self.scopes.lookup(&def.name).map(|v| v.type_of()) {
                Some(Type::StructType(real)) => Type::StructType(real),
                _ => ty.clone(),
            },
            Type::Array(inner) => Type::Array(Box::new(self.resolve_type(inner))),
            other => other.clone(),
        }
    }

    fn eval_struct_literal(
        &mut self,
        name: &str,
        initializers: &[crate::ast::StructInitializer],
        span: Span,
    ) -> EResult<Value> {
        let struct_type = self
            .scopes
            .lookup(name)
            .cloned()
            .ok_or_else(|| Signal::Error(RuntimeError::new(RuntimeErrorKind::UnknownType { name: name.to_string() }, span.clone())))?;
        let definition: Rc<StructDef> = match struct_type.type_of() {
            Type::StructType(def) => def,
            _ => {
                return Err(Signal::Error(RuntimeError::new(
                    RuntimeErrorKind::UnknownType { name: name.to_string() },
                    span,
                )))
            }
        };

        let mut members = HashMap::new();
        for init in initializers {
            if !definition.members.iter().any(|(n, _)| n == &init.name) {
                return Err(Signal::Error(RuntimeError::new(
                    RuntimeErrorKind::NoSuchMember { member: init.name.clone(), type_name: definition.name.clone() },
                    init.span.clone(),
                )));
            }
            if members.contains_key(&init.name) {
                return Err(Signal::Error(RuntimeError::new(
                    RuntimeErrorKind::SymbolRedefinition { name: init.name.clone() },
                    init.span.clone(),
                )));
            }
            let value = self.eval(&init.value)?;
            let (_, declared_type) = definition.members.iter().find(|(n, _)| n == &init.name).unwrap();
            let declared_type = self.resolve_type(declared_type);
            if !declared_type.can_be_created_from(&value.type_of()) {
                return Err(Signal::Error(RuntimeError::type_mismatch(&declared_type, &value.type_of(), init.span.clone())));
            }
            let bound = if value.is_rvalue() {
                value.promote_to_lvalue();
                value
            } else {
                let clone = value.deep_clone();
                clone.promote_to_lvalue();
                clone
            };
            members.insert(init.name.clone(), bound);
        }

        if members.len() != definition.members.len() {
            for (member_name, _) in &definition.members {
                if !members.contains_key(member_name) {
                    return Err(Signal::Error(RuntimeError::new(
                        RuntimeErrorKind::NoSuchMember { member: member_name.clone(), type_name: definition.name.clone() },
                        span,
                    )));
                }
            }
        }

        Ok(Value::struct_instance(definition, members, ValueCategory::Rvalue))
    }

    fn call(&mut self, callee: &Value, arg_exprs: &[Expr], span: Span) -> EResult<Value> {
        match callee.type_of() {
            Type::Function(_, _) => self.call_function(callee, arg_exprs, span),
            Type::BuiltinFunction(kind) => {
                let mut args = Vec::with_capacity(arg_exprs.len());
                for e in arg_exprs {
                    args.push((self.eval(e)?, e.span.clone()));
                }
                builtins::call(kind, &args, span, kind.name()).map_err(Signal::Error)
            }
            _ => Err(Signal::Error(RuntimeError::operation_not_supported("call", &[&callee.type_name()], span))),
        }
    }

    fn call_function(&mut self, callee: &Value, arg_exprs: &[Expr], span: Span) -> EResult<Value> {
        let decl = callee.as_function_decl().expect("checked by caller's type_of match");

        if arg_exprs.len() != decl.params.len() {
            return Err(Signal::Error(RuntimeError::new(
                RuntimeErrorKind::WrongNumberOfArguments {
                    name: decl.name.clone(),
                    expected: decl.params.len(),
                    actual: arg_exprs.len(),
                },
                span,
            )));
        }

        let mut bindings = Vec::with_capacity(decl.params.len());
        for (param, arg_expr) in decl.params.iter().zip(arg_exprs) {
            let value = self.eval(arg_expr)?;
            let expected = self.resolve_type(&param.ty);
            if !expected.can_be_created_from(&value.type_of()) {
                return Err(Signal::Error(RuntimeError::new(
                    RuntimeErrorKind::WrongArgumentType {
                        name: decl.name.clone(),
                        param: param.name.clone(),
                        found: value.type_name(),
                    },
                    arg_expr.span.clone(),
                )));
            }
            bindings.push((param.name.clone(), value));
        }

        let depth = self.scopes.depth();
        self.scopes.push_scope();
        for (name, value) in bindings {
            self.scopes.define(&name, value);
        }

        let mut result = Value::nothing();
        let mut signal_result = Ok(());
        for stmt in &decl.body {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Signal::Return(_, value)) => {
                    result = value;
                    break;
                }
                Err(other) => {
                    signal_result = Err(other);
                    break;
                }
            }
        }
        self.scopes.truncate_to(depth);
        signal_result?;

        let expected_return = self.resolve_type(&decl.return_type);
        if !expected_return.can_be_created_from(&result.type_of()) {
            return Err(Signal::Error(RuntimeError::new(
                RuntimeErrorKind::ReturnTypeMismatch {
                    expected: expected_return.to_string(),
                    actual: result.type_name(),
                },
                decl.span.clone(),
            )));
        }
        Ok(result)
    }
}

fn is_true(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

fn io_error(e: std::io::Error, span: Span) -> Signal {
    Signal::Error(RuntimeError::new(RuntimeErrorKind::Io { message: e.to_string() }, span))
}
