//! Pure arithmetic trees evaluated against a scan.
//!
//! Integer arithmetic stays integral until it overflows `i64`, at which point
//! it continues in `f64`. Failures come back as [`EvalFault`] so consumers
//! decide which fault tag to raise; nothing here ever yields NaN or infinity.

use std::ops;

use crate::block::IndirectRef;
use crate::context::ScanContext;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Abs,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Radians,
    Degrees,
    Log,
    Log10,
}

/// Shift and rotate helpers working on 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordFn {
    Lsh,
    Rsh,
    Lro,
    Rro,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Tag(Tag),
    Indirect(Box<IndirectRef>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Math(MathFn, Box<Expression>),
    Word(WordFn, Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalFault {
    DivisionByZero,
    /// Operation undefined for its operands (sqrt of a negative, text in math...).
    Domain,
    NonFinite,
    /// An indirect reference pointed outside its block.
    Address,
}

impl EvalFault {
    pub fn fault(self) -> Fault {
        match self {
            EvalFault::Address => Fault::AddressError,
            _ => Fault::DivisionError,
        }
    }
}

type Eval<T> = std::result::Result<T, EvalFault>;

#[derive(Debug, Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn from_value(value: &Value) -> Eval<Num> {
        match value {
            Value::Bool(b) => Ok(Num::I(*b as i64)),
            Value::Int(i) => Ok(Num::I(*i)),
            Value::Real(x) => Ok(Num::F(*x)),
            Value::Char(_) => Err(EvalFault::Domain),
        }
    }

    fn f(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(x) => x,
        }
    }

    fn int(self) -> Eval<i64> {
        match self {
            Num::I(i) => Ok(i),
            Num::F(x) if x.is_finite() => Ok(x.trunc() as i64),
            Num::F(_) => Err(EvalFault::Domain),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::I(i) => i == 0,
            Num::F(x) => x == 0.0,
        }
    }

    fn into_value(self) -> Eval<Value> {
        match self {
            Num::I(i) => Ok(Value::Int(i)),
            Num::F(x) if x.is_finite() => Ok(Value::Real(x)),
            Num::F(_) => Err(EvalFault::NonFinite),
        }
    }
}

fn checked_or_float(
    a: Num,
    b: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Num {
    match (a, b) {
        (Num::I(x), Num::I(y)) => match int_op(x, y) {
            Some(r) => Num::I(r),
            None => Num::F(float_op(x as f64, y as f64)),
        },
        _ => Num::F(float_op(a.f(), b.f())),
    }
}

fn floor_div_int(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn py_mod_int(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn py_mod_float(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

fn apply_binary(op: BinaryOp, a: Num, b: Num) -> Eval<Num> {
    let result = match op {
        BinaryOp::Add => checked_or_float(a, b, i64::checked_add, |x, y| x + y),
        BinaryOp::Sub => checked_or_float(a, b, i64::checked_sub, |x, y| x - y),
        BinaryOp::Mul => checked_or_float(a, b, i64::checked_mul, |x, y| x * y),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(EvalFault::DivisionByZero);
            }
            Num::F(a.f() / b.f())
        }
        BinaryOp::FloorDiv => {
            if b.is_zero() {
                return Err(EvalFault::DivisionByZero);
            }
            checked_or_float(a, b, floor_div_int, |x, y| (x / y).floor())
        }
        BinaryOp::Mod => {
            if b.is_zero() {
                return Err(EvalFault::DivisionByZero);
            }
            checked_or_float(a, b, py_mod_int, py_mod_float)
        }
        BinaryOp::Pow => match (a, b) {
            (Num::I(x), Num::I(y)) if y >= 0 => match u32::try_from(y)
                .ok()
                .and_then(|e| x.checked_pow(e))
            {
                Some(r) => Num::I(r),
                None => Num::F((x as f64).powf(y as f64)),
            },
            _ => {
                if a.is_zero() && b.f() < 0.0 {
                    return Err(EvalFault::DivisionByZero);
                }
                let r = a.f().powf(b.f());
                if r.is_nan() {
                    return Err(EvalFault::Domain);
                }
                Num::F(r)
            }
        },
        BinaryOp::BitAnd => Num::I(a.int()? & b.int()?),
        BinaryOp::BitOr => Num::I(a.int()? | b.int()?),
        BinaryOp::BitXor => Num::I(a.int()? ^ b.int()?),
        BinaryOp::Shl => {
            let (x, n) = (a.int()?, b.int()?);
            if n < 0 {
                return Err(EvalFault::Domain);
            }
            Num::I(if n >= 64 { 0 } else { x.wrapping_shl(n as u32) })
        }
        BinaryOp::Shr => {
            let (x, n) = (a.int()?, b.int()?);
            if n < 0 {
                return Err(EvalFault::Domain);
            }
            Num::I(if n >= 64 { if x < 0 { -1 } else { 0 } } else { x >> n })
        }
    };
    Ok(result)
}

fn apply_unary(op: UnaryOp, a: Num) -> Eval<Num> {
    Ok(match (op, a) {
        (UnaryOp::Pos, a) => a,
        (UnaryOp::Neg, Num::I(i)) => i.checked_neg().map_or(Num::F(-(i as f64)), Num::I),
        (UnaryOp::Neg, Num::F(x)) => Num::F(-x),
        (UnaryOp::Abs, Num::I(i)) => i.checked_abs().map_or(Num::F((i as f64).abs()), Num::I),
        (UnaryOp::Abs, Num::F(x)) => Num::F(x.abs()),
        (UnaryOp::BitNot, a) => Num::I(!a.int()?),
    })
}

fn apply_math(func: MathFn, a: Num) -> Eval<Num> {
    let x = a.f();
    let r = match func {
        MathFn::Sqrt if x < 0.0 => return Err(EvalFault::Domain),
        MathFn::Sqrt => x.sqrt(),
        MathFn::Sin => x.sin(),
        MathFn::Cos => x.cos(),
        MathFn::Tan => x.tan(),
        MathFn::Asin | MathFn::Acos if !(-1.0..=1.0).contains(&x) => {
            return Err(EvalFault::Domain);
        }
        MathFn::Asin => x.asin(),
        MathFn::Acos => x.acos(),
        MathFn::Atan => x.atan(),
        MathFn::Radians => x.to_radians(),
        MathFn::Degrees => x.to_degrees(),
        MathFn::Log | MathFn::Log10 if x <= 0.0 => return Err(EvalFault::Domain),
        MathFn::Log => x.ln(),
        MathFn::Log10 => x.log10(),
    };
    Ok(Num::F(r))
}

fn apply_word(func: WordFn, value: Num, amount: Num) -> Eval<Num> {
    let v = (value.int()? & 0xFFFF) as u16;
    let n = amount.int()?;
    let r = match func {
        WordFn::Lsh | WordFn::Rsh if n < 0 => return Err(EvalFault::Domain),
        WordFn::Lsh if n >= 16 => 0,
        WordFn::Rsh if n >= 16 => 0,
        WordFn::Lsh => v << n,
        WordFn::Rsh => v >> n,
        WordFn::Lro => v.rotate_left(n.rem_euclid(16) as u32),
        WordFn::Rro => v.rotate_right(n.rem_euclid(16) as u32),
    };
    Ok(Num::I(r as i64))
}

impl Expression {
    pub fn lit<V: Into<Value>>(value: V) -> Self {
        Expression::Literal(value.into())
    }

    pub fn tag(tag: &Tag) -> Self {
        Expression::Tag(tag.clone())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn math(func: MathFn, arg: Expression) -> Self {
        Expression::Math(func, Box::new(arg))
    }

    pub fn word(func: WordFn, value: Expression, amount: Expression) -> Self {
        Expression::Word(func, Box::new(value), Box::new(amount))
    }

    pub fn floor_div<E: Into<Expression>>(self, rhs: E) -> Self {
        Expression::binary(BinaryOp::FloorDiv, self, rhs.into())
    }

    pub fn pow<E: Into<Expression>>(self, rhs: E) -> Self {
        Expression::binary(BinaryOp::Pow, self, rhs.into())
    }

    pub fn abs(self) -> Self {
        Expression::Unary(UnaryOp::Abs, Box::new(self))
    }

    pub fn evaluate(&self, ctx: &ScanContext) -> Eval<Value> {
        match self {
            Expression::Literal(v) => Ok(v.clone()),
            Expression::Tag(t) => Ok(ctx.read(t)),
            Expression::Indirect(r) => r
                .resolve(ctx)
                .map(|t| ctx.read(&t))
                .ok_or(EvalFault::Address),
            Expression::Binary(op, a, b) => {
                let a = Num::from_value(&a.evaluate(ctx)?)?;
                let b = Num::from_value(&b.evaluate(ctx)?)?;
                apply_binary(*op, a, b)?.into_value()
            }
            Expression::Unary(op, a) => {
                apply_unary(*op, Num::from_value(&a.evaluate(ctx)?)?)?.into_value()
            }
            Expression::Math(func, a) => {
                apply_math(*func, Num::from_value(&a.evaluate(ctx)?)?)?.into_value()
            }
            Expression::Word(func, v, n) => {
                let v = Num::from_value(&v.evaluate(ctx)?)?;
                let n = Num::from_value(&n.evaluate(ctx)?)?;
                apply_word(*func, v, n)?.into_value()
            }
        }
    }

    /// Type the expression yields when it is a bare reference or literal.
    pub fn static_type(&self) -> Option<TagType> {
        match self {
            Expression::Tag(t) => Some(t.tag_type),
            Expression::Indirect(r) => Some(r.block.tag_type),
            Expression::Literal(Value::Char(_)) => Some(TagType::Char),
            _ => None,
        }
    }

    /// False when any leaf is text; such trees cannot take part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        match self {
            Expression::Literal(v) => v.is_numeric(),
            Expression::Tag(t) => t.tag_type != TagType::Char,
            Expression::Indirect(r) => r.block.tag_type != TagType::Char,
            Expression::Binary(_, a, b) | Expression::Word(_, a, b) => {
                a.is_numeric() && b.is_numeric()
            }
            Expression::Unary(_, a) | Expression::Math(_, a) => a.is_numeric(),
        }
    }
}

pub fn lsh<V: Into<Expression>, N: Into<Expression>>(value: V, amount: N) -> Expression {
    Expression::word(WordFn::Lsh, value.into(), amount.into())
}

pub fn rsh<V: Into<Expression>, N: Into<Expression>>(value: V, amount: N) -> Expression {
    Expression::word(WordFn::Rsh, value.into(), amount.into())
}

pub fn lro<V: Into<Expression>, N: Into<Expression>>(value: V, amount: N) -> Expression {
    Expression::word(WordFn::Lro, value.into(), amount.into())
}

pub fn rro<V: Into<Expression>, N: Into<Expression>>(value: V, amount: N) -> Expression {
    Expression::word(WordFn::Rro, value.into(), amount.into())
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Literal(Value::Int(value))
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Literal(Value::Int(value as i64))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Literal(Value::Real(value))
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Literal(Value::Bool(value))
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Literal(Value::from(value))
    }
}

impl From<Tag> for Expression {
    fn from(tag: Tag) -> Self {
        Expression::Tag(tag)
    }
}

impl From<&Tag> for Expression {
    fn from(tag: &Tag) -> Self {
        Expression::Tag(tag.clone())
    }
}

impl From<IndirectRef> for Expression {
    fn from(r: IndirectRef) -> Self {
        Expression::Indirect(Box::new(r))
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expression>> ops::$trait<R> for Expression {
            type Output = Expression;
            fn $method(self, rhs: R) -> Expression {
                Expression::binary($op, self, rhs.into())
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);
binary_operator!(Rem, rem, BinaryOp::Mod);
binary_operator!(BitAnd, bitand, BinaryOp::BitAnd);
binary_operator!(BitOr, bitor, BinaryOp::BitOr);
binary_operator!(BitXor, bitxor, BinaryOp::BitXor);
binary_operator!(Shl, shl, BinaryOp::Shl);
binary_operator!(Shr, shr, BinaryOp::Shr);

impl ops::Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        Expression::Unary(UnaryOp::Neg, Box::new(self))
    }
}

impl ops::Not for Expression {
    type Output = Expression;
    fn not(self) -> Expression {
        Expression::Unary(UnaryOp::BitNot, Box::new(self))
    }
}
