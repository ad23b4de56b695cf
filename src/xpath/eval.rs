//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against either document view.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledNodeTest, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{document_order, XPathNode, XPathValue};
use crate::dom::{DocumentAccess, DOCUMENT_NODE};
use crate::error::QueryError;

/// Evaluation context - generic over the document view
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub node: XPathNode,
    pub position: usize,
    pub size: usize,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    /// Context for a top-level evaluation: position and size are 1
    pub fn new(doc: &'a D, node: impl Into<XPathNode>) -> Self {
        EvalContext {
            doc,
            node: node.into(),
            position: 1,
            size: 1,
        }
    }

    fn with_node(&self, node: XPathNode, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            node,
            position,
            size,
        }
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, QueryError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                stack.push(XPathValue::single_node(DOCUMENT_NODE));
            }

            Op::Context => {
                stack.push(XPathValue::single_node(ctx.node));
            }

            Op::Step {
                axis,
                test,
                predicates,
            } => {
                let nodes = pop_nodeset(&mut stack, "a location step")?;
                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    result.extend(step(ctx, node, *axis, test, predicates)?);
                }
                document_order(&mut result);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Filter(pred_expr) => {
                let nodes = pop_nodeset(&mut stack, "a filter predicate")?;
                stack.push(XPathValue::NodeSet(apply_predicate(ctx, nodes, pred_expr)?));
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack, "the union operator")?;
                let mut result = pop_nodeset(&mut stack, "the union operator")?;
                result.extend(right);
                document_order(&mut result);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::And(right) => {
                let left = pop(&mut stack).to_boolean();
                let value = left && evaluate_compiled(right, ctx)?.to_boolean();
                stack.push(XPathValue::Boolean(value));
            }

            Op::Or(right) => {
                let left = pop(&mut stack).to_boolean();
                let value = left || evaluate_compiled(right, ctx)?.to_boolean();
                stack.push(XPathValue::Boolean(value));
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Variable(name) => {
                return Err(QueryError::UnknownVariable(name.clone()));
            }

            Op::Negate => {
                let val = pop(&mut stack);
                stack.push(XPathValue::Number(-val.to_number(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack);
                let left = pop(&mut stack);
                stack.push(binary(ctx.doc, *op, &left, &right));
            }

            Op::Call(name, arg_count) => {
                let split = stack.len().saturating_sub(*arg_count);
                let args = stack.split_off(split);
                stack.push(functions::call(name, args, ctx)?);
            }
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

fn pop(stack: &mut Vec<XPathValue>) -> XPathValue {
    stack.pop().unwrap_or_default()
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, context: &str) -> Result<Vec<XPathNode>, QueryError> {
    match pop(stack) {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        _ => Err(QueryError::Type {
            context: context.to_string(),
            expected: "a node-set",
        }),
    }
}

/// One location step from one context node. Predicates see positions in
/// the axis' proximity order.
fn step<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    node: XPathNode,
    axis: Axis,
    test: &CompiledNodeTest,
    predicates: &[CompiledExpr],
) -> Result<Vec<XPathNode>, QueryError> {
    let mut selected: Vec<XPathNode> = navigate(ctx.doc, node, axis)
        .into_iter()
        .filter(|&candidate| matches_node_test(ctx.doc, candidate, axis, test))
        .collect();
    for predicate in predicates {
        if selected.is_empty() {
            break;
        }
        selected = apply_predicate(ctx, selected, predicate)?;
    }
    Ok(selected)
}

fn apply_predicate<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<XPathNode>,
    predicate: &CompiledExpr,
) -> Result<Vec<XPathNode>, QueryError> {
    let size = nodes.len();
    let mut filtered = Vec::with_capacity(size);

    for (i, node) in nodes.into_iter().enumerate() {
        let pred_ctx = ctx.with_node(node, i + 1, size);
        let include = match evaluate_compiled(predicate, &pred_ctx)? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            filtered.push(node);
        }
    }

    Ok(filtered)
}

fn binary<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> XPathValue {
    let arithmetic = |f: fn(f64, f64) -> f64| XPathValue::Number(f(left.to_number(doc), right.to_number(doc)));
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, op, left, right)),
        BinaryOp::Add => arithmetic(|a, b| a + b),
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Div => arithmetic(|a, b| a / b),
        BinaryOp::Mod => arithmetic(|a, b| a % b),
    }
}

/// Comparison per XPath 1.0 section 3.4.
///
/// Node-sets compare existentially: the result is true if some node's
/// string-value satisfies the comparison.
fn compare<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(ln), XPathValue::NodeSet(rn)) => {
            let right_values: Vec<String> = rn.iter().map(|n| n.string_value(doc)).collect();
            ln.iter().any(|l| {
                let ls = l.string_value(doc);
                right_values.iter().any(|rs| compare_strings(op, &ls, rs))
            })
        }
        (XPathValue::NodeSet(_), XPathValue::Boolean(b)) => {
            compare_atomic(doc, op, &XPathValue::Boolean(left.to_boolean()), &XPathValue::Boolean(*b))
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(_)) => {
            compare_atomic(doc, op, &XPathValue::Boolean(*b), &XPathValue::Boolean(right.to_boolean()))
        }
        (XPathValue::NodeSet(nodes), other) => nodes.iter().any(|n| {
            compare_atomic(doc, op, &XPathValue::String(n.string_value(doc)), other)
        }),
        (other, XPathValue::NodeSet(nodes)) => nodes.iter().any(|n| {
            compare_atomic(doc, op, other, &XPathValue::String(n.string_value(doc)))
        }),
        _ => compare_atomic(doc, op, left, right),
    }
}

/// Two string-values from node-sets: equality on strings, order on numbers
fn compare_strings(op: BinaryOp, left: &str, right: &str) -> bool {
    match op {
        BinaryOp::Eq => left == right,
        BinaryOp::NotEq => left != right,
        _ => compare_numbers(
            op,
            super::value::parse_number(left),
            super::value::parse_number(right),
        ),
    }
}

fn compare_atomic<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: &XPathValue,
    right: &XPathValue,
) -> bool {
    let equal = match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            if matches!(left, XPathValue::Boolean(_)) || matches!(right, XPathValue::Boolean(_)) {
                left.to_boolean() == right.to_boolean()
            } else if matches!(left, XPathValue::Number(_)) || matches!(right, XPathValue::Number(_)) {
                left.to_number(doc) == right.to_number(doc)
            } else {
                left.to_string_value(doc) == right.to_string_value(doc)
            }
        }
        _ => return compare_numbers(op, left.to_number(doc), right.to_number(doc)),
    };
    if op == BinaryOp::Eq {
        equal
    } else {
        !equal
    }
}

fn compare_numbers(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        _ => false,
    }
}
