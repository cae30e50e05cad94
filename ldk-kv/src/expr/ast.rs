//! AST shared by the condition/filter and update expression parsers
//! (spec §4.8).

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Attribute(String),
    Index(usize),
}

pub type Path = Vec<PathSegment>;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(Path),
    Value(String),
    /// `size(path)`; not listed under `Operand` in the formal grammar but
    /// accepted there in practice (it is the only sensible placement for
    /// the only `Func` alternative that yields a scalar rather than a
    /// condition) — see the KV engine's Open Question note on this.
    Size(Path),
    /// `if_not_exists(path, fallback)`; modeled as an operand (not a
    /// standalone `SetValue`) so it can sit on either side of the
    /// arithmetic `+`/`-` a SET clause allows, e.g.
    /// `SET ctr = if_not_exists(ctr, :zero) + :incr`.
    IfNotExists(Path, Box<Operand>),
    /// `list_append(a, b)`; an operand for the same reason.
    ListAppend(Box<Operand>, Box<Operand>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Cmp(Operand, CmpOp, Operand),
    Between(Operand, Operand, Operand),
    In(Operand, Vec<Operand>),
    AttributeExists(Path),
    AttributeNotExists(Path),
    AttributeType(Path, Operand),
    BeginsWith(Path, Operand),
    Contains(Path, Operand),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
