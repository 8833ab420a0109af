//! Concrete values and their arithmetic.
//!
//! The same bit-level semantics back both constant folding in the
//! `World` and the reference interpreter, so a folded graph and an
//! interpreted one can never disagree.

use crate::def::{ArithOpKind, ConvOpKind, Def, PrimTypeKind, RelOpKind};

/// Parameter bindings visible to a closure.
pub type Env = im::HashMap<Def, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Lit(PrimTypeKind, u64),
    Tuple(Vec<Value>),
    Closure(Def, Env),
    Undef,
}

impl Value {
    pub fn u1(b: bool) -> Value {
        Value::Lit(PrimTypeKind::U1, b as u64)
    }

    pub fn lit(kind: PrimTypeKind, bits: u64) -> Value {
        Value::Lit(kind, normalize(kind, bits))
    }

    pub fn as_bits(&self) -> Option<u64> {
        match self {
            Value::Lit(_, bits) => Some(*bits),
            _ => None,
        }
    }
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Canonical bit pattern of a literal of `kind`: everything above the
/// width is zero.
pub fn normalize(kind: PrimTypeKind, bits: u64) -> u64 {
    bits & mask(kind.bits())
}

fn sext(kind: PrimTypeKind, bits: u64) -> i64 {
    let width = kind.bits();
    if width >= 64 {
        bits as i64
    } else {
        let shift = 64 - width;
        ((bits << shift) as i64) >> shift
    }
}

fn to_f64(kind: PrimTypeKind, bits: u64) -> f64 {
    match kind {
        PrimTypeKind::F32 => f32::from_bits(bits as u32) as f64,
        PrimTypeKind::F64 => f64::from_bits(bits),
        _ => unreachable!("not a float kind: {:?}", kind),
    }
}

fn from_f64(kind: PrimTypeKind, f: f64) -> u64 {
    match kind {
        PrimTypeKind::F32 => (f as f32).to_bits() as u64,
        PrimTypeKind::F64 => f.to_bits(),
        _ => unreachable!("not a float kind: {:?}", kind),
    }
}

/// Evaluates `a op b` at `kind`. Returns `None` where the result is
/// undefined (integer division or remainder by zero).
pub fn arith(op: ArithOpKind, kind: PrimTypeKind, a: u64, b: u64) -> Option<u64> {
    if kind.is_float() {
        assert!(!op.is_bitwise(), "{} is not defined on {}", op.name(), kind.name());
        let (x, y) = (to_f64(kind, a), to_f64(kind, b));
        let r = match op {
            ArithOpKind::Add => x + y,
            ArithOpKind::Sub => x - y,
            ArithOpKind::Mul => x * y,
            ArithOpKind::Div => x / y,
            ArithOpKind::Rem => x % y,
            _ => unreachable!(),
        };
        return Some(from_f64(kind, r));
    }

    let width = kind.bits();
    let shamt = b & u64::from(width - 1);
    let r = match op {
        ArithOpKind::Add => a.wrapping_add(b),
        ArithOpKind::Sub => a.wrapping_sub(b),
        ArithOpKind::Mul => a.wrapping_mul(b),
        ArithOpKind::Div | ArithOpKind::Rem if normalize(kind, b) == 0 => return None,
        ArithOpKind::Div if kind.is_signed() => sext(kind, a).wrapping_div(sext(kind, b)) as u64,
        ArithOpKind::Div => a / b,
        ArithOpKind::Rem if kind.is_signed() => sext(kind, a).wrapping_rem(sext(kind, b)) as u64,
        ArithOpKind::Rem => a % b,
        ArithOpKind::And => a & b,
        ArithOpKind::Or => a | b,
        ArithOpKind::Xor => a ^ b,
        ArithOpKind::Shl => a.wrapping_shl(shamt as u32),
        ArithOpKind::Shr if kind.is_signed() => (sext(kind, a) >> shamt) as u64,
        ArithOpKind::Shr => a >> shamt,
    };
    Some(normalize(kind, r))
}

pub fn relop(op: RelOpKind, kind: PrimTypeKind, a: u64, b: u64) -> bool {
    if kind.is_float() {
        let (x, y) = (to_f64(kind, a), to_f64(kind, b));
        return match op {
            RelOpKind::Eq => x == y,
            RelOpKind::Ne => x != y,
            RelOpKind::Lt => x < y,
            RelOpKind::Le => x <= y,
            RelOpKind::Gt => x > y,
            RelOpKind::Ge => x >= y,
        };
    }
    let ord = if kind.is_signed() {
        sext(kind, a).cmp(&sext(kind, b))
    } else {
        a.cmp(&b)
    };
    match op {
        RelOpKind::Eq => ord.is_eq(),
        RelOpKind::Ne => ord.is_ne(),
        RelOpKind::Lt => ord.is_lt(),
        RelOpKind::Le => ord.is_le(),
        RelOpKind::Gt => ord.is_gt(),
        RelOpKind::Ge => ord.is_ge(),
    }
}

pub fn convert(op: ConvOpKind, from: PrimTypeKind, to: PrimTypeKind, bits: u64) -> u64 {
    match op {
        ConvOpKind::Bitcast => {
            assert_eq!(from.bits(), to.bits(), "bitcast between different widths");
            normalize(to, bits)
        }
        ConvOpKind::Cast => match (from.is_float(), to.is_float()) {
            (false, false) if from.is_signed() => normalize(to, sext(from, bits) as u64),
            (false, false) => normalize(to, bits),
            (false, true) if from.is_signed() => from_f64(to, sext(from, bits) as f64),
            (false, true) => from_f64(to, bits as f64),
            (true, false) if to.is_signed() => normalize(to, to_f64(from, bits) as i64 as u64),
            (true, false) => normalize(to, to_f64(from, bits) as u64),
            (true, true) => from_f64(to, to_f64(from, bits)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arith_wraps_to_width() {
        assert_eq!(arith(ArithOpKind::Add, PrimTypeKind::U8, 250, 10), Some(4));
        assert_eq!(arith(ArithOpKind::Sub, PrimTypeKind::U32, 0, 1), Some(0xffff_ffff));
        assert_eq!(arith(ArithOpKind::Mul, PrimTypeKind::U1, 1, 1), Some(1));
    }

    #[test]
    fn signed_division_uses_sign() {
        let minus_six = normalize(PrimTypeKind::I32, (-6i64) as u64);
        let minus_three = normalize(PrimTypeKind::I32, (-3i64) as u64);
        assert_eq!(arith(ArithOpKind::Div, PrimTypeKind::I32, minus_six, 2), Some(minus_three));
        assert_eq!(arith(ArithOpKind::Div, PrimTypeKind::U32, 6, 0), None);
        assert_eq!(arith(ArithOpKind::Rem, PrimTypeKind::I32, 7, 0), None);
    }

    #[test]
    fn shifts_are_masked() {
        assert_eq!(arith(ArithOpKind::Shl, PrimTypeKind::U32, 1, 3), Some(8));
        assert_eq!(arith(ArithOpKind::Shr, PrimTypeKind::I8, 0x80, 7), Some(0xff));
        assert_eq!(arith(ArithOpKind::Shr, PrimTypeKind::U8, 0x80, 7), Some(1));
    }

    #[test]
    fn relational_ops_respect_signedness() {
        let minus_one = normalize(PrimTypeKind::I32, u64::MAX);
        assert!(relop(RelOpKind::Lt, PrimTypeKind::I32, minus_one, 0));
        assert!(!relop(RelOpKind::Lt, PrimTypeKind::U32, minus_one, 0));
        assert!(relop(RelOpKind::Ge, PrimTypeKind::U64, 5, 5));
    }

    #[test]
    fn float_arith_and_casts() {
        let two = 2.0f64.to_bits();
        let three = 3.0f64.to_bits();
        let six = arith(ArithOpKind::Mul, PrimTypeKind::F64, two, three).unwrap();
        assert_eq!(f64::from_bits(six), 6.0);
        assert_eq!(convert(ConvOpKind::Cast, PrimTypeKind::F64, PrimTypeKind::I32, six), 6);
        let minus_one = normalize(PrimTypeKind::I8, u64::MAX);
        assert_eq!(
            convert(ConvOpKind::Cast, PrimTypeKind::I8, PrimTypeKind::I64, minus_one),
            u64::MAX
        );
        assert_eq!(convert(ConvOpKind::Cast, PrimTypeKind::U8, PrimTypeKind::U64, 0xff), 0xff);
    }
}
