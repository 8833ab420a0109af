//! Graph nodes.
//!
//! A `Def` is a handle into the `World`'s arena. What the handle points
//! at is a `DefData`: a closed `NodeKind`, an optional type (another
//! `Def`; only type nodes have none), the operand list, and the set of
//! use-edges pointing back at consumers.
//!
//! Structural nodes are identified by `(kind, type, ops)` and unified by
//! the `World`. Nominal nodes (continuations and their parameters) are
//! identified by their handle alone and may be mutated in place.

use smallvec::SmallVec;
use std::collections::BTreeSet;

waffle::declare_entity!(Def, "%");

pub type Ops = SmallVec<[Def; 4]>;

/// Primitive type kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimTypeKind {
    U1,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PrimTypeKind {
    pub fn bits(self) -> u32 {
        match self {
            PrimTypeKind::U1 => 1,
            PrimTypeKind::U8 | PrimTypeKind::I8 => 8,
            PrimTypeKind::U16 | PrimTypeKind::I16 => 16,
            PrimTypeKind::U32 | PrimTypeKind::I32 | PrimTypeKind::F32 => 32,
            PrimTypeKind::U64 | PrimTypeKind::I64 | PrimTypeKind::F64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimTypeKind::F32 | PrimTypeKind::F64)
    }

    pub fn is_int(self) -> bool {
        !self.is_float()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimTypeKind::I8 | PrimTypeKind::I16 | PrimTypeKind::I32 | PrimTypeKind::I64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimTypeKind::U1 => "u1",
            PrimTypeKind::U8 => "u8",
            PrimTypeKind::U16 => "u16",
            PrimTypeKind::U32 => "u32",
            PrimTypeKind::U64 => "u64",
            PrimTypeKind::I8 => "i8",
            PrimTypeKind::I16 => "i16",
            PrimTypeKind::I32 => "i32",
            PrimTypeKind::I64 => "i64",
            PrimTypeKind::F32 => "f32",
            PrimTypeKind::F64 => "f64",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArithOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl ArithOpKind {
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            ArithOpKind::Add
                | ArithOpKind::Mul
                | ArithOpKind::And
                | ArithOpKind::Or
                | ArithOpKind::Xor
        )
    }

    /// Operations only defined on integer types.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOpKind::And
                | ArithOpKind::Or
                | ArithOpKind::Xor
                | ArithOpKind::Shl
                | ArithOpKind::Shr
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithOpKind::Add => "add",
            ArithOpKind::Sub => "sub",
            ArithOpKind::Mul => "mul",
            ArithOpKind::Div => "div",
            ArithOpKind::Rem => "rem",
            ArithOpKind::And => "and",
            ArithOpKind::Or => "or",
            ArithOpKind::Xor => "xor",
            ArithOpKind::Shl => "shl",
            ArithOpKind::Shr => "shr",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelOpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOpKind {
    pub fn is_commutative(self) -> bool {
        matches!(self, RelOpKind::Eq | RelOpKind::Ne)
    }

    pub fn name(self) -> &'static str {
        match self {
            RelOpKind::Eq => "eq",
            RelOpKind::Ne => "ne",
            RelOpKind::Lt => "lt",
            RelOpKind::Le => "le",
            RelOpKind::Gt => "gt",
            RelOpKind::Ge => "ge",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConvOpKind {
    /// Numeric conversion between any two primitive kinds.
    Cast,
    /// Reinterpretation of the bits; widths must agree.
    Bitcast,
}

impl ConvOpKind {
    pub fn name(self) -> &'static str {
        match self {
            ConvOpKind::Cast => "cast",
            ConvOpKind::Bitcast => "bitcast",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    PrimType(PrimTypeKind),
    /// Tuple type; ops are the element types.
    Sigma,
    /// Continuation type; ops are the parameter types.
    Pi,
    /// Literal; bits are kept masked to the width of the kind.
    Lit(PrimTypeKind, u64),
    Undef,
    ArithOp(ArithOpKind),
    RelOp(RelOpKind),
    ConvOp(ConvOpKind),
    Select,
    Tuple,
    Extract(u32),
    Insert(u32),
    Lambda,
    Param { lambda: Def, index: u32 },
}

impl NodeKind {
    pub fn is_nominal(&self) -> bool {
        matches!(self, NodeKind::Lambda | NodeKind::Param { .. })
    }

    pub fn is_type(&self) -> bool {
        matches!(self, NodeKind::PrimType(_) | NodeKind::Sigma | NodeKind::Pi)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, NodeKind::Lit(..) | NodeKind::Undef)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::PrimType(k) => k.name(),
            NodeKind::Sigma => "sigma",
            NodeKind::Pi => "pi",
            NodeKind::Lit(..) => "lit",
            NodeKind::Undef => "undef",
            NodeKind::ArithOp(k) => k.name(),
            NodeKind::RelOp(k) => k.name(),
            NodeKind::ConvOp(k) => k.name(),
            NodeKind::Select => "select",
            NodeKind::Tuple => "tuple",
            NodeKind::Extract(_) => "extract",
            NodeKind::Insert(_) => "insert",
            NodeKind::Lambda => "lambda",
            NodeKind::Param { .. } => "param",
        }
    }
}

/// A use-edge: `user.ops[index]` refers to the node holding this edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Use {
    pub user: Def,
    pub index: u32,
}

/// Hash-consing key of a structural node.
pub type Key = (NodeKind, Option<Def>, Ops);

#[derive(Clone, Debug)]
pub struct DefData {
    pub kind: NodeKind,
    pub ty: Option<Def>,
    pub ops: Ops,
    pub uses: BTreeSet<Use>,
    /// Debug name; empty for most structural nodes.
    pub name: String,
    /// Parameters, for continuations only.
    pub params: Vec<Def>,
    pub alive: bool,
}

impl DefData {
    pub fn new(kind: NodeKind, ty: Option<Def>, ops: Ops) -> DefData {
        DefData {
            kind,
            ty,
            ops,
            uses: BTreeSet::new(),
            name: String::new(),
            params: vec![],
            alive: true,
        }
    }

    pub fn key(&self) -> Key {
        debug_assert!(!self.kind.is_nominal());
        (self.kind, self.ty, self.ops.clone())
    }

    pub fn is_lambda(&self) -> bool {
        self.kind == NodeKind::Lambda
    }

    pub fn is_param(&self) -> bool {
        matches!(self.kind, NodeKind::Param { .. })
    }
}
