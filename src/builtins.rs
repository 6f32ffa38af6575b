//! The fixed set of built-in callables pre-installed in the global scope.
//!
//! Built-ins share the interpreter's calling convention in spirit (arity and
//! per-argument type checks with source-located errors) but are implemented
//! directly in Rust rather than as AST bodies.

use std::fs;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::span::Span;
use crate::types::{BuiltinKind, Type};
use crate::value::{Value, ValueCategory};

type Arg = (Value, Span);

pub fn call(kind: BuiltinKind, args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    match kind {
        BuiltinKind::Split => split(args, span, name),
        BuiltinKind::Join => join(args, span, name),
        BuiltinKind::Delete => delete(args, span, name),
        BuiltinKind::Read => read(args, span, name),
        BuiltinKind::Write => write(args, span, name),
        BuiltinKind::Trim => trim(args, span, name),
    }
}

fn arity_error(name: &str, expected: usize, actual: usize, span: Span) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::WrongNumberOfArguments { name: name.to_string(), expected, actual }, span)
}

fn type_error(name: &str, param: &str, arg: &Arg) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::WrongArgumentType { name: name.to_string(), param: param.to_string(), found: arg.0.type_name() },
        arg.1.clone(),
    )
}

fn expect_string(arg: &Arg, name: &str, param: &str) -> Result<String, RuntimeError> {
    if !matches!(arg.0.type_of(), Type::String) {
        return Err(RuntimeError::new(
            RuntimeErrorKind::WrongArgumentType { name: name.to_string(), param: param.to_string(), found: arg.0.type_name() },
            arg.1.clone(),
        ));
    }
    Ok(arg.0.string_representation())
}

fn expect_char(arg: &Arg, name: &str, param: &str) -> Result<u8, RuntimeError> {
    arg.0.as_char().ok_or_else(|| {
        RuntimeError::new(
            RuntimeErrorKind::WrongArgumentType { name: name.to_string(), param: param.to_string(), found: arg.0.type_name() },
            arg.1.clone(),
        )
    })
}

fn expect_bool(arg: &Arg, name: &str, param: &str) -> Result<bool, RuntimeError> {
    arg.0.as_bool().ok_or_else(|| {
        RuntimeError::new(
            RuntimeErrorKind::WrongArgumentType { name: name.to_string(), param: param.to_string(), found: arg.0.type_name() },
            arg.1.clone(),
        )
    })
}

fn expect_integer(arg: &Arg, name: &str, param: &str) -> Result<i32, RuntimeError> {
    arg.0.as_i32().ok_or_else(|| {
        RuntimeError::new(
            RuntimeErrorKind::WrongArgumentType { name: name.to_string(), param: param.to_string(), found: arg.0.type_name() },
            arg.1.clone(),
        )
    })
}

fn split(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(arity_error(name, 2, args.len(), span));
    }
    let text = expect_string(&args[0], name, "s")?;
    let sep = expect_char(&args[1], name, "sep")?;
    let discard_empty = if args.len() == 3 { expect_bool(&args[2], name, "discard_empty")? } else { false };

    let parts: Vec<&str> = text.split(sep as char).collect();
    let values = parts
        .into_iter()
        .filter(|p| !discard_empty || !p.is_empty())
        .map(|p| Value::string(p, ValueCategory::Lvalue))
        .collect();
    Ok(Value::array(values, ValueCategory::Rvalue))
}

fn join(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(arity_error(name, 2, args.len(), span.clone()));
    }
    let Type::Array(_) = args[0].0.type_of() else {
        return Err(type_error(name, "iter", &args[0]));
    };
    let sep = match args[1].0.type_of() {
        Type::String => args[1].0.string_representation(),
        Type::Char => args[1].0.string_representation(),
        _ => return Err(type_error(name, "sep", &args[1])),
    };

    let iterator = args[0].0.iterator(span.clone())?;
    let mut parts = Vec::new();
    loop {
        let item = iterator.next();
        if item.is_sentinel() {
            break;
        }
        parts.push(item.string_representation());
    }
    Ok(Value::string(&parts.join(&sep), ValueCategory::Rvalue))
}

fn delete(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(arity_error(name, 2, args.len(), span));
    }
    let container = &args[0].0;
    if !container.is_lvalue() {
        return Err(RuntimeError::new(RuntimeErrorKind::LvalueRequired, args[0].1.clone()));
    }
    let index = expect_integer(&args[1], name, "index")?;
    container.delete_at(index, args[0].1.clone())?;
    Ok(Value::nothing())
}

fn read(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(arity_error(name, 1, args.len(), span));
    }
    let path = expect_string(&args[0], name, "path")?;
    let contents = fs::read_to_string(&path)
        .map_err(|e| RuntimeError::new(RuntimeErrorKind::Io { message: format!("{path}: {e}") }, args[0].1.clone()))?;
    Ok(Value::string(&contents, ValueCategory::Rvalue))
}

fn write(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 2 {
        return Err(arity_error(name, 2, args.len(), span));
    }
    let data = expect_string(&args[0], name, "data")?;
    let path = expect_string(&args[1], name, "path")?;
    fs::write(&path, data)
        .map_err(|e| RuntimeError::new(RuntimeErrorKind::Io { message: format!("{path}: {e}") }, args[1].1.clone()))?;
    Ok(Value::nothing())
}

fn trim(args: &[Arg], span: Span, name: &str) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(arity_error(name, 1, args.len(), span));
    }
    let text = expect_string(&args[0], name, "s")?;
    Ok(Value::string(text.trim_matches(|c: char| c.is_ascii_whitespace()), ValueCategory::Rvalue))
}
