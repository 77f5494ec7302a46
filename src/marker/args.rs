//! Constant evaluation of marker arguments

use crate::document::AttributeArgs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{BinOp, Expr, Lit, Token, UnOp};

/// A compile-time constant argument value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConstValue {
    Str(String),
    Int(i128),
    Float(f64),
    Bool(bool),
    Char(char),
    Array(Vec<ConstValue>),
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConstValue::Str(_) => "string",
            ConstValue::Int(_) => "integer",
            ConstValue::Float(_) => "float",
            ConstValue::Bool(_) => "bool",
            ConstValue::Char(_) => "char",
            ConstValue::Array(_) => "array",
        }
    }
}

// Floats compare by bit pattern so arguments can key the cache
impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Char(a), ConstValue::Char(b)) => a == b,
            (ConstValue::Array(a), ConstValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ConstValue::Str(s) => s.hash(state),
            ConstValue::Int(i) => i.hash(state),
            ConstValue::Float(f) => f.to_bits().hash(state),
            ConstValue::Bool(b) => b.hash(state),
            ConstValue::Char(c) => c.hash(state),
            ConstValue::Array(items) => items.hash(state),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Str(s) => write!(f, "{:?}", s),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::Float(x) => write!(f, "{:?}", x),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Char(c) => write!(f, "{:?}", c),
            ConstValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Evaluated constructor arguments of a marker
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerArgs {
    pub positional: Vec<ConstValue>,
    pub named: BTreeMap<String, ConstValue>,
}

impl MarkerArgs {
    /// Evaluate raw attribute arguments.
    ///
    /// `#[m(a, b, key = c)]` yields two positional and one named value;
    /// `#[m = a]` yields one positional value.
    pub fn evaluate(raw: &AttributeArgs) -> Result<Self, String> {
        let mut args = MarkerArgs::default();
        match raw {
            AttributeArgs::None => {}
            AttributeArgs::Value(text) => {
                let expr: Expr = syn::parse_str(text).map_err(|e| e.to_string())?;
                args.positional.push(evaluate_expr(&expr)?);
            }
            AttributeArgs::List(tokens) => {
                let exprs = Punctuated::<Expr, Token![,]>::parse_terminated
                    .parse_str(tokens)
                    .map_err(|e| format!("invalid arguments: {}", e))?;
                for expr in exprs {
                    match expr {
                        Expr::Assign(assign) => {
                            let key = match assign.left.as_ref() {
                                Expr::Path(p) if p.qself.is_none() => p
                                    .path
                                    .get_ident()
                                    .map(ToString::to_string)
                                    .ok_or_else(|| "argument name must be an identifier".to_string())?,
                                _ => return Err("argument name must be an identifier".to_string()),
                            };
                            let value = evaluate_expr(&assign.right)?;
                            if args.named.insert(key.clone(), value).is_some() {
                                return Err(format!("argument `{}` given more than once", key));
                            }
                        }
                        other => args.positional.push(evaluate_expr(&other)?),
                    }
                }
            }
        }
        Ok(args)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn positional(&self, index: usize) -> Option<&ConstValue> {
        self.positional.get(index)
    }

    pub fn named(&self, key: &str) -> Option<&ConstValue> {
        self.named.get(key)
    }

    /// Named value if present, otherwise the positional value at `index`
    pub fn get(&self, index: usize, key: &str) -> Option<&ConstValue> {
        self.named(key).or_else(|| self.positional(index))
    }
}

impl fmt::Display for MarkerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}", value)?;
        }
        for (key, value) in &self.named {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}

fn evaluate_expr(expr: &Expr) -> Result<ConstValue, String> {
    match expr {
        Expr::Lit(lit) => evaluate_lit(&lit.lit),
        Expr::Paren(p) => evaluate_expr(&p.expr),
        Expr::Group(g) => evaluate_expr(&g.expr),
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            match evaluate_expr(&unary.expr)? {
                ConstValue::Int(i) => i
                    .checked_neg()
                    .map(ConstValue::Int)
                    .ok_or_else(|| "integer overflow".to_string()),
                ConstValue::Float(x) => Ok(ConstValue::Float(-x)),
                other => Err(format!("cannot negate a {}", other.type_name())),
            }
        }
        Expr::Binary(binary) => {
            let left = evaluate_expr(&binary.left)?;
            let right = evaluate_expr(&binary.right)?;
            let (ConstValue::Int(l), ConstValue::Int(r)) = (&left, &right) else {
                return Err(format!(
                    "cannot fold {} and {}",
                    left.type_name(),
                    right.type_name()
                ));
            };
            let folded = match binary.op {
                BinOp::Add(_) => l.checked_add(*r),
                BinOp::Sub(_) => l.checked_sub(*r),
                BinOp::Mul(_) => l.checked_mul(*r),
                _ => return Err(format!("`{}` is not a constant expression", tokens(expr))),
            };
            folded
                .map(ConstValue::Int)
                .ok_or_else(|| "integer overflow".to_string())
        }
        Expr::Array(array) => array
            .elems
            .iter()
            .map(evaluate_expr)
            .collect::<Result<Vec<_>, _>>()
            .map(ConstValue::Array),
        Expr::Tuple(tuple) => tuple
            .elems
            .iter()
            .map(evaluate_expr)
            .collect::<Result<Vec<_>, _>>()
            .map(ConstValue::Array),
        _ => Err(format!("`{}` is not a constant expression", tokens(expr))),
    }
}

fn evaluate_lit(lit: &Lit) -> Result<ConstValue, String> {
    match lit {
        Lit::Str(s) => Ok(ConstValue::Str(s.value())),
        Lit::Int(i) => i
            .base10_parse::<i128>()
            .map(ConstValue::Int)
            .map_err(|e| e.to_string()),
        Lit::Float(x) => x
            .base10_parse::<f64>()
            .map(ConstValue::Float)
            .map_err(|e| e.to_string()),
        Lit::Bool(b) => Ok(ConstValue::Bool(b.value)),
        Lit::Char(c) => Ok(ConstValue::Char(c.value())),
        Lit::Byte(b) => Ok(ConstValue::Int(b.value() as i128)),
        _ => Err("unsupported literal".to_string()),
    }
}

fn tokens(expr: &Expr) -> String {
    quote::ToTokens::to_token_stream(expr).to_string()
}
