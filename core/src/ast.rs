//! Expression trees handed to the compiler.
//!
//! Hosts produce these from whatever syntax front end they use. Every node
//! carries a [`Span`] whose start offset prefixes the messages of errors
//! raised for that node.

use core::fmt;
use core::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }

    pub fn start(&self) -> usize {
        self.0.start
    }

    pub fn combine(a: &Span, b: &Span) -> Span {
        Span::new(a.0.start, b.0.end)
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        &source[self.0.start..self.0.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.start)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self(range)
    }
}

/// A zero-width span at `pos`.
impl From<usize> for Span {
    fn from(pos: usize) -> Self {
        Self(pos..pos)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Complement,
    Deref,
    AddrOf,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Complement => "^",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    // Accepted by the tree but rejected by the compiler.
    Xor,
    BitAnd,
    BitOr,
    Shl,
    Shr,
    AndNot,
}

impl BinaryOp {
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Double(f64),
    Str(String),
    /// Compiled as a one-character string.
    Char(char),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Selector {
        receiver: Box<Expr>,
        name: String,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        receiver: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    TypeAssert {
        receiver: Box<Expr>,
        target: Box<Expr>,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: impl Into<Span>) -> Self {
        Self {
            kind,
            span: span.into(),
        }
    }

    pub fn literal(literal: Literal, span: impl Into<Span>) -> Self {
        Self::new(ExprKind::Literal(literal), span)
    }

    pub fn int(value: i64, span: impl Into<Span>) -> Self {
        Self::literal(Literal::Int(value), span)
    }

    pub fn double(value: f64, span: impl Into<Span>) -> Self {
        Self::literal(Literal::Double(value), span)
    }

    pub fn string(value: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::literal(Literal::Str(value.into()), span)
    }

    pub fn char(value: char, span: impl Into<Span>) -> Self {
        Self::literal(Literal::Char(value), span)
    }

    pub fn bool(value: bool, span: impl Into<Span>) -> Self {
        Self::literal(Literal::Bool(value), span)
    }

    pub fn ident(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::new(ExprKind::Ident(name.into()), span)
    }

    pub fn unary(op: UnaryOp, operand: Expr, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn call(callee: Expr, args: Vec<Expr>, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        )
    }

    pub fn selector(receiver: Expr, name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::Selector {
                receiver: Box::new(receiver),
                name: name.into(),
            },
            span,
        )
    }

    pub fn index(receiver: Expr, index: Expr, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::Index {
                receiver: Box::new(receiver),
                index: Box::new(index),
            },
            span,
        )
    }

    pub fn slice(
        receiver: Expr,
        low: Option<Expr>,
        high: Option<Expr>,
        max: Option<Expr>,
        span: impl Into<Span>,
    ) -> Self {
        Self::new(
            ExprKind::Slice {
                receiver: Box::new(receiver),
                low: low.map(Box::new),
                high: high.map(Box::new),
                max: max.map(Box::new),
            },
            span,
        )
    }

    pub fn type_assert(receiver: Expr, target: Expr, span: impl Into<Span>) -> Self {
        Self::new(
            ExprKind::TypeAssert {
                receiver: Box::new(receiver),
                target: Box::new(target),
            },
            span,
        )
    }

    pub fn paren(inner: Expr, span: impl Into<Span>) -> Self {
        Self::new(ExprKind::Paren(Box::new(inner)), span)
    }
}
