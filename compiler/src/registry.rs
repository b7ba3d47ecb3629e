// registry.rs — Operator descriptor registry
//
// Static metadata for the closed set of operator kinds: the named input
// ports (each with the default used when the port is unbound) and the named
// output ports. Descriptors are `'static` and shared by every graph and
// backend; nothing here is mutable.

use std::fmt;

// ── Data types ──────────────────────────────────────────────────────────────

/// Upper bound on the input or output port count of any operator.
pub const MAX_PORTS: usize = 2;

/// One input port declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDecl {
    pub name: &'static str,
    /// Value substituted when the port has no incoming binding.
    pub default: f64,
}

/// Port layout of one operator kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpDescriptor {
    pub name: &'static str,
    pub inputs: &'static [InputDecl],
    pub outputs: &'static [&'static str],
}

/// Operator kind, without instance data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Const,
    Abs,
    Plus,
    Mult,
    RectToPolar,
    Cos,
}

/// An operator instance. Only `Const` carries data (its literal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Const(f64),
    Abs,
    Plus,
    Mult,
    RectToPolar,
    Cos,
}

// ── Descriptor table ────────────────────────────────────────────────────────

const CONST: OpDescriptor = OpDescriptor {
    name: "Const",
    inputs: &[],
    outputs: &["out"],
};

const ABS: OpDescriptor = OpDescriptor {
    name: "Abs",
    inputs: &[InputDecl {
        name: "op",
        default: 0.0,
    }],
    outputs: &["abs"],
};

const PLUS: OpDescriptor = OpDescriptor {
    name: "Plus",
    inputs: &[
        InputDecl {
            name: "op1",
            default: 0.0,
        },
        InputDecl {
            name: "op2",
            default: 0.0,
        },
    ],
    outputs: &["sum"],
};

const MULT: OpDescriptor = OpDescriptor {
    name: "Mult",
    inputs: &[
        InputDecl {
            name: "op1",
            default: 1.0,
        },
        InputDecl {
            name: "op2",
            default: 1.0,
        },
    ],
    outputs: &["prod"],
};

// `r` is the squared radius x² + y², not the Euclidean radius.
const RECT_TO_POLAR: OpDescriptor = OpDescriptor {
    name: "RectToPolar",
    inputs: &[
        InputDecl {
            name: "x",
            default: 0.0,
        },
        InputDecl {
            name: "y",
            default: 0.0,
        },
    ],
    outputs: &["r", "theta"],
};

const COS: OpDescriptor = OpDescriptor {
    name: "Cos",
    inputs: &[InputDecl {
        name: "theta",
        default: 0.0,
    }],
    outputs: &["out"],
};

/// All operator kinds in declaration order.
pub const ALL_KINDS: [OpKind; 6] = [
    OpKind::Const,
    OpKind::Abs,
    OpKind::Plus,
    OpKind::Mult,
    OpKind::RectToPolar,
    OpKind::Cos,
];

impl OpKind {
    pub fn descriptor(self) -> &'static OpDescriptor {
        match self {
            OpKind::Const => &CONST,
            OpKind::Abs => &ABS,
            OpKind::Plus => &PLUS,
            OpKind::Mult => &MULT,
            OpKind::RectToPolar => &RECT_TO_POLAR,
            OpKind::Cos => &COS,
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Const(_) => OpKind::Const,
            Op::Abs => OpKind::Abs,
            Op::Plus => OpKind::Plus,
            Op::Mult => OpKind::Mult,
            Op::RectToPolar => OpKind::RectToPolar,
            Op::Cos => OpKind::Cos,
        }
    }

    pub fn descriptor(&self) -> &'static OpDescriptor {
        self.kind().descriptor()
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for OpDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {:?}", input.name, input.default)?;
        }
        write!(f, ") -> ({})", self.outputs.join(", "))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
