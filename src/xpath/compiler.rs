//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a stack program. Prefixes in name
//! tests are resolved here, against the query's namespace bindings.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::dom::NamespaceContext;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with one step from each node
    Step {
        axis: Axis,
        test: CompiledNodeTest,
        predicates: Vec<CompiledExpr>,
    },
    /// Filter the node-set on top of the stack, positions in document order
    Filter(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    /// Short-circuit `and`: evaluate the right side only if the left is true
    And(Box<CompiledExpr>),
    /// Short-circuit `or`
    Or(Box<CompiledExpr>),
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function
    Call(String, usize), // name, arg count
    /// Binary operation other than `and` / `or`
    Binary(BinaryOp),
    /// Negate
    Negate,
    /// Variable reference
    Variable(String),
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    /// `*`
    Any,
    /// Unprefixed name
    Name(String),
    /// `prefix:local`; `uri` is `None` when the prefix is not bound
    QName {
        prefix: String,
        local: String,
        uri: Option<String>,
    },
    /// `prefix:*`
    NamespaceWildcard { prefix: String, uri: Option<String> },
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr, namespaces: &NamespaceContext) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, namespaces, &mut ops);
        CompiledExpr { ops }
    }

    /// First prefix in a name test, predicates included, that the
    /// bindings did not resolve
    pub fn unbound_prefix(&self) -> Option<&str> {
        self.ops.iter().find_map(|op| match op {
            Op::Step { test, predicates, .. } => match test {
                CompiledNodeTest::QName { prefix, uri: None, .. }
                | CompiledNodeTest::NamespaceWildcard { prefix, uri: None } => Some(prefix.as_str()),
                _ => None,
            }
            .or_else(|| predicates.iter().find_map(CompiledExpr::unbound_prefix)),
            Op::Filter(inner) | Op::And(inner) | Op::Or(inner) => inner.unbound_prefix(),
            _ => None,
        })
    }

    fn compile_expr(expr: &Expr, namespaces: &NamespaceContext, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => {
                ops.push(Op::Root);
            }
            Expr::Number(n) => {
                ops.push(Op::Number(*n));
            }
            Expr::String(s) => {
                ops.push(Op::String(s.clone()));
            }
            Expr::Variable(name) => {
                ops.push(Op::Variable(name.clone()));
            }
            Expr::Negate(inner) => {
                Self::compile_expr(inner, namespaces, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, BinaryOp::And, right) => {
                Self::compile_expr(left, namespaces, ops);
                ops.push(Op::And(Box::new(Self::compile(right, namespaces))));
            }
            Expr::Binary(left, BinaryOp::Or, right) => {
                Self::compile_expr(left, namespaces, ops);
                ops.push(Op::Or(Box::new(Self::compile(right, namespaces))));
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, namespaces, ops);
                Self::compile_expr(right, namespaces, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, namespaces, ops);
                Self::compile_expr(right, namespaces, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, namespaces, ops);
                Self::compile_step(step, namespaces, ops);
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, namespaces, ops);
                ops.push(Op::Filter(Box::new(Self::compile(pred, namespaces))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                Self::compile_step(step, namespaces, ops);
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, namespaces, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step, namespaces: &NamespaceContext, ops: &mut Vec<Op>) {
        let resolve = |prefix: &str| namespaces.resolve(prefix).map(str::to_string);
        let test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(prefix, local) => CompiledNodeTest::QName {
                prefix: prefix.clone(),
                local: local.clone(),
                uri: resolve(prefix),
            },
            NodeTest::NamespaceWildcard(prefix) => CompiledNodeTest::NamespaceWildcard {
                prefix: prefix.clone(),
                uri: resolve(prefix),
            },
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => {
                CompiledNodeTest::ProcessingInstruction(arg.clone())
            }
        };

        let predicates = step
            .predicates
            .iter()
            .map(|pred| Self::compile(pred, namespaces))
            .collect();
        ops.push(Op::Step {
            axis: step.axis,
            test,
            predicates,
        });
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str, namespaces: &NamespaceContext) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr, namespaces))
}
