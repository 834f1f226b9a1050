//! Abstract syntax tree for run-if conditions and declaration blocks.
//!
//! `Display` renders nodes back to canonical source text: literals use their Python `repr`, and sub-expressions are
//! parenthesized only where precedence requires it. The notebook rewriter relies on this to regenerate
//! `register_current_*` cells.

use std::fmt;

use nbvalx_core::lang::operators::{self, OperatorId, UNARY_PRECEDENCE};

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type Ident = String;

// ============================================================================
// Literals
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    /// Python type name, used in diagnostics (`TypeError: ... 'str' and 'int'`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::None => "NoneType",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{}", float_repr(*x)),
            Literal::Str(s) => write!(f, "{}", str_repr(s)),
        }
    }
}

/// Python `repr` of a float.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        // Rust prints `1e20` / `1.5e-7`; Python prints `1e+20` / `1.5e-07`.
        let exp = format!("{x:e}");
        let Some((mantissa, exponent)) = exp.split_once('e') else {
            return exp;
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    if x.fract() == 0.0 { format!("{x:.1}") } else { format!("{x}") }
}

/// Python `repr` of a string: single quotes unless the text contains `'` and no `"`.
pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    And,
    Or,
}

impl BinaryOp {
    pub fn operator_id(self) -> OperatorId {
        match self {
            BinaryOp::Add => OperatorId::Plus,
            BinaryOp::Sub => OperatorId::Minus,
            BinaryOp::Mul => OperatorId::Star,
            BinaryOp::Div => OperatorId::Slash,
            BinaryOp::FloorDiv => OperatorId::SlashSlash,
            BinaryOp::Mod => OperatorId::Percent,
            BinaryOp::Pow => OperatorId::StarStar,
            BinaryOp::And => OperatorId::And,
            BinaryOp::Or => OperatorId::Or,
        }
    }

    pub fn precedence(self) -> u8 {
        operators::info_for(self.operator_id()).precedence
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", operators::as_str(self.operator_id()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(Ident),
    Tuple(Vec<Spanned<Expr>>),
    List(Vec<Spanned<Expr>>),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    /// `a < b <= c` keeps every operator of the chain.
    Compare(Box<Spanned<Expr>>, Vec<(CompareOp, Spanned<Expr>)>),
}

const COMPARE_PRECEDENCE: u8 = 40;
const ATOM_PRECEDENCE: u8 = u8::MAX;

impl Expr {
    /// Binding strength of the outermost node (atoms bind tightest).
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Literal(_) | Expr::Name(_) | Expr::Tuple(_) | Expr::List(_) => ATOM_PRECEDENCE,
            Expr::Unary(UnaryOp::Not, _) => operators::info_for(OperatorId::Not).precedence,
            Expr::Unary(_, _) => UNARY_PRECEDENCE,
            Expr::Binary(_, op, _) => op.precedence(),
            Expr::Compare(_, _) => COMPARE_PRECEDENCE,
        }
    }

    /// Every name referenced by the expression, in source order (duplicates kept).
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Name(n) => out.push(n),
            Expr::Tuple(items) | Expr::List(items) => items.iter().for_each(|i| i.node.collect_names(out)),
            Expr::Unary(_, e) => e.node.collect_names(out),
            Expr::Binary(l, _, r) => {
                l.node.collect_names(out);
                r.node.collect_names(out);
            }
            Expr::Compare(first, rest) => {
                first.node.collect_names(out);
                rest.iter().for_each(|(_, e)| e.node.collect_names(out));
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, e: &Expr, parenthesize: bool) -> fmt::Result {
    if parenthesize { write!(f, "({e})") } else { write!(f, "{e}") }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Spanned<Expr>]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item.node)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Name(n) => write!(f, "{n}"),
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Expr::Unary(op, operand) => {
                let p = self.precedence();
                match op {
                    UnaryOp::Not => write!(f, "not ")?,
                    UnaryOp::Neg => write!(f, "-")?,
                    UnaryOp::Pos => write!(f, "+")?,
                }
                write_operand(f, &operand.node, operand.node.precedence() < p)
            }
            Expr::Binary(lhs, op, rhs) => {
                let p = op.precedence();
                // `**` is right-associative; everything else associates left.
                let (left_paren, right_paren) = if *op == BinaryOp::Pow {
                    (lhs.node.precedence() <= p, rhs.node.precedence() < p)
                } else {
                    (lhs.node.precedence() < p, rhs.node.precedence() <= p)
                };
                write_operand(f, &lhs.node, left_paren)?;
                write!(f, " {op} ")?;
                write_operand(f, &rhs.node, right_paren)
            }
            Expr::Compare(first, rest) => {
                write_operand(f, &first.node, first.node.precedence() <= COMPARE_PRECEDENCE)?;
                for (op, operand) in rest {
                    write!(f, " {op} ")?;
                    write_operand(f, &operand.node, operand.node.precedence() <= COMPARE_PRECEDENCE)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Declaration blocks
// ============================================================================

/// `name: v1, v2, ...`
#[derive(Debug, Clone, PartialEq)]
pub struct AllowedDecl {
    pub name: Spanned<Ident>,
    pub values: Vec<Spanned<Literal>>,
}

impl fmt::Display for AllowedDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name.node)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v.node)?;
        }
        Ok(())
    }
}

/// `name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: Spanned<Ident>,
    pub value: Spanned<Literal>,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name.node, self.value.node)
    }
}
