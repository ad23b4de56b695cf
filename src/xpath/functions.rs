//! XPath 1.0 Functions
//!
//! Implements the XPath 1.0 core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()
//!
//! `id()` needs DTD attribute types and always fails.

use super::eval::EvalContext;
use super::value::{parse_number, XPathNode, XPathValue};
use crate::core::cursor::is_xml_whitespace;
use crate::dom::{DocumentAccess, NameParts, NodeKind};
use crate::error::QueryError;

/// Evaluate a function call
pub fn call<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, QueryError> {
    let doc = ctx.doc;
    let value = match name {
        // Node Set Functions
        "position" => {
            arity(name, &args, 0, 0, "no")?;
            XPathValue::Number(ctx.position as f64)
        }
        "last" => {
            arity(name, &args, 0, 0, "no")?;
            XPathValue::Number(ctx.size as f64)
        }
        "count" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Number(nodeset_arg(name, &args[0])?.len() as f64)
        }
        "local-name" => name_function(name, &args, ctx, |parts| parts.local)?,
        "namespace-uri" => name_function(name, &args, ctx, |parts| parts.namespace.unwrap_or(""))?,
        "name" => name_function(name, &args, ctx, |parts| parts.qualified)?,
        "id" => return Err(QueryError::Unsupported("id".to_string())),

        // String Functions
        "string" => {
            arity(name, &args, 0, 1, "0 or 1")?;
            XPathValue::String(string_or_context(&args, ctx))
        }
        "concat" => {
            arity(name, &args, 2, usize::MAX, "at least 2")?;
            XPathValue::String(args.iter().map(|a| a.to_string_value(doc)).collect())
        }
        "starts-with" => {
            let (s, prefix) = two_strings(name, &args, ctx)?;
            XPathValue::Boolean(s.starts_with(&prefix))
        }
        "contains" => {
            let (s, pattern) = two_strings(name, &args, ctx)?;
            XPathValue::Boolean(s.contains(&pattern))
        }
        "substring" => {
            arity(name, &args, 2, 3, "2 or 3")?;
            let s = args[0].to_string_value(doc);
            let start = args[1].to_number(doc);
            let length = args.get(2).map(|a| a.to_number(doc));
            XPathValue::String(substring(&s, start, length))
        }
        "substring-before" => {
            let (s, pattern) = two_strings(name, &args, ctx)?;
            let result = s.find(&pattern).map(|pos| &s[..pos]).unwrap_or("");
            XPathValue::String(result.to_string())
        }
        "substring-after" => {
            let (s, pattern) = two_strings(name, &args, ctx)?;
            let result = s.find(&pattern).map(|pos| &s[pos + pattern.len()..]).unwrap_or("");
            XPathValue::String(result.to_string())
        }
        "string-length" => {
            arity(name, &args, 0, 1, "0 or 1")?;
            XPathValue::Number(string_or_context(&args, ctx).chars().count() as f64)
        }
        "normalize-space" => {
            arity(name, &args, 0, 1, "0 or 1")?;
            let s = string_or_context(&args, ctx);
            let normalized: Vec<&str> = s.split(is_xml_whitespace).filter(|w| !w.is_empty()).collect();
            XPathValue::String(normalized.join(" "))
        }
        "translate" => {
            arity(name, &args, 3, 3, "exactly 3")?;
            let s = args[0].to_string_value(doc);
            let from: Vec<char> = args[1].to_string_value(doc).chars().collect();
            let to: Vec<char> = args[2].to_string_value(doc).chars().collect();
            XPathValue::String(translate(&s, &from, &to))
        }

        // Boolean Functions
        "boolean" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Boolean(args[0].to_boolean())
        }
        "not" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Boolean(!args[0].to_boolean())
        }
        "true" => {
            arity(name, &args, 0, 0, "no")?;
            XPathValue::Boolean(true)
        }
        "false" => {
            arity(name, &args, 0, 0, "no")?;
            XPathValue::Boolean(false)
        }
        "lang" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Boolean(lang(ctx, &args[0].to_string_value(doc)))
        }

        // Number Functions
        "number" => {
            arity(name, &args, 0, 1, "0 or 1")?;
            let value = match args.first() {
                Some(arg) => arg.to_number(doc),
                None => parse_number(&ctx.node.string_value(doc)),
            };
            XPathValue::Number(value)
        }
        "sum" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            let total = nodeset_arg(name, &args[0])?
                .iter()
                .map(|node| parse_number(&node.string_value(doc)))
                .sum();
            XPathValue::Number(total)
        }
        "floor" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Number(args[0].to_number(doc).floor())
        }
        "ceiling" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Number(args[0].to_number(doc).ceil())
        }
        "round" => {
            arity(name, &args, 1, 1, "exactly 1")?;
            XPathValue::Number(round(args[0].to_number(doc)))
        }

        _ => return Err(QueryError::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

fn arity(
    function: &str,
    args: &[XPathValue],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), QueryError> {
    if args.len() < min || args.len() > max {
        return Err(QueryError::Arity {
            function: function.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn nodeset_arg<'v>(function: &str, arg: &'v XPathValue) -> Result<&'v [XPathNode], QueryError> {
    arg.as_nodeset().ok_or_else(|| QueryError::Type {
        context: format!("{}()", function),
        expected: "a node-set argument",
    })
}

fn two_strings<D: DocumentAccess + ?Sized>(
    function: &str,
    args: &[XPathValue],
    ctx: &EvalContext<'_, D>,
) -> Result<(String, String), QueryError> {
    arity(function, args, 2, 2, "exactly 2")?;
    Ok((args[0].to_string_value(ctx.doc), args[1].to_string_value(ctx.doc)))
}

/// The first argument as a string, or the context node's string-value
fn string_or_context<D: DocumentAccess + ?Sized>(args: &[XPathValue], ctx: &EvalContext<'_, D>) -> String {
    match args.first() {
        Some(arg) => arg.to_string_value(ctx.doc),
        None => ctx.node.string_value(ctx.doc),
    }
}

/// name(), local-name(), namespace-uri(): names come from the view, so the
/// unaware view reports qualified names and no namespaces
fn name_function<D: DocumentAccess + ?Sized>(
    function: &str,
    args: &[XPathValue],
    ctx: &EvalContext<'_, D>,
    select: impl Fn(NameParts<'_>) -> &str,
) -> Result<XPathValue, QueryError> {
    arity(function, args, 0, 1, "0 or 1")?;
    let node = match args.first() {
        None => Some(ctx.node),
        Some(arg) => nodeset_arg(function, arg)?.first().copied(),
    };
    let doc = ctx.doc;
    let name = match node {
        Some(XPathNode::Attribute { attr, .. }) => select(doc.attribute_name(attr)).to_string(),
        Some(XPathNode::Node(id)) => match doc.node_kind_of(id) {
            Some(NodeKind::Element) => select(doc.node_name(id)).to_string(),
            // A PI's expanded name is its target, with no namespace
            Some(NodeKind::ProcessingInstruction) if function != "namespace-uri" => {
                doc.document().name(id).to_string()
            }
            _ => String::new(),
        },
        None => String::new(),
    };
    Ok(XPathValue::String(name))
}

/// XPath substring(): characters whose 1-based position p satisfies
/// round(start) <= p < round(start) + round(length)
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let last = match length {
        Some(len) => first + round(len),
        None => f64::INFINITY,
    };
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= first && p < last
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &[char], to: &[char]) -> String {
    s.chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect()
}

/// XPath round: halves go towards positive infinity
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// lang(): nearest xml:lang on the context node or an ancestor, matched
/// case-insensitively, with subtag prefixes ("en" matches "en-US")
fn lang<D: DocumentAccess + ?Sized>(ctx: &EvalContext<'_, D>, target: &str) -> bool {
    let document = ctx.doc.document();
    let target = target.to_lowercase();
    let mut node = Some(ctx.node.anchor());
    while let Some(id) = node {
        if let Some(attr) = document.attribute_by_name(id, "xml:lang") {
            let lang = document.attribute_value(attr).to_lowercase();
            return lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
        }
        node = document.parent(id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{LocatedDocument, DOCUMENT_NODE};

    fn string(s: &str) -> XPathValue {
        XPathValue::String(s.to_string())
    }

    fn call_at(doc: &LocatedDocument, node: XPathNode, name: &str, args: Vec<XPathValue>) -> XPathValue {
        let view = doc.aware();
        call(name, args, &EvalContext::new(&view, node)).unwrap()
    }

    #[test]
    fn test_concat() {
        let doc = LocatedDocument::parse("<r/>").unwrap();
        let result = call_at(
            &doc,
            XPathNode::Node(DOCUMENT_NODE),
            "concat",
            vec![string("hello"), string(" "), string("world")],
        );
        assert_eq!(result, string("hello world"));
    }

    #[test]
    fn test_substring() {
        assert_eq!(substring("hello", 2.0, Some(3.0)), "ell");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(substring("12345", 2.0, None), "2345");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert!(round(f64::NAN).is_nan());
    }

    #[test]
    fn test_translate() {
        let from: Vec<char> = "abc".chars().collect();
        let to: Vec<char> = "AB".chars().collect();
        assert_eq!(translate("--aaabbbccc--", &from, &to), "--AAABBB--");
    }

    #[test]
    fn test_normalize_space() {
        let doc = LocatedDocument::parse("<r/>").unwrap();
        let result = call_at(
            &doc,
            XPathNode::Node(DOCUMENT_NODE),
            "normalize-space",
            vec![string("  hello \t\n  world  ")],
        );
        assert_eq!(result, string("hello world"));
    }

    #[test]
    fn test_id_is_unsupported() {
        let doc = LocatedDocument::parse("<r/>").unwrap();
        let view = doc.aware();
        let ctx = EvalContext::new(&view, DOCUMENT_NODE);
        assert_eq!(
            call("id", vec![string("foo")], &ctx),
            Err(QueryError::Unsupported("id".to_string()))
        );
    }

    #[test]
    fn test_arity_and_unknown() {
        let doc = LocatedDocument::parse("<r/>").unwrap();
        let view = doc.aware();
        let ctx = EvalContext::new(&view, DOCUMENT_NODE);
        assert!(matches!(
            call("count", vec![], &ctx),
            Err(QueryError::Arity { found: 0, .. })
        ));
        assert!(matches!(
            call("count", vec![string("x")], &ctx),
            Err(QueryError::Type { .. })
        ));
        assert!(matches!(
            call("frobnicate", vec![], &ctx),
            Err(QueryError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_lang_matches_subtag_prefix() {
        let doc = LocatedDocument::parse("<root xml:lang=\"en-US\"><child/></root>").unwrap();
        let root = doc.root_element().unwrap();
        let child = XPathNode::Node(doc.children(root).next().unwrap());
        assert_eq!(call_at(&doc, child, "lang", vec![string("en")]), XPathValue::Boolean(true));
        assert_eq!(call_at(&doc, child, "lang", vec![string("de")]), XPathValue::Boolean(false));
    }

    #[test]
    fn test_names_depend_on_view() {
        let doc = LocatedDocument::parse("<root xmlns:ns=\"http://example.com\"><ns:child/></root>").unwrap();
        let root = doc.root_element().unwrap();
        let child = XPathNode::Node(doc.children(root).next().unwrap());

        assert_eq!(call_at(&doc, child, "local-name", vec![]), string("child"));
        assert_eq!(call_at(&doc, child, "namespace-uri", vec![]), string("http://example.com"));
        assert_eq!(call_at(&doc, child, "name", vec![]), string("ns:child"));

        let unaware = doc.unaware();
        let ctx = EvalContext::new(&unaware, child);
        assert_eq!(call("local-name", vec![], &ctx).unwrap(), string("ns:child"));
        assert_eq!(call("namespace-uri", vec![], &ctx).unwrap(), string(""));
    }

    #[test]
    fn test_sum_and_number() {
        let doc = LocatedDocument::parse("<r><v>1</v><v>2.5</v></r>").unwrap();
        let root = doc.root_element().unwrap();
        let values: Vec<_> = doc.child_elements(root).map(XPathNode::Node).collect();
        let total = call_at(&doc, XPathNode::Node(root), "sum", vec![XPathValue::NodeSet(values)]);
        assert_eq!(total, XPathValue::Number(3.5));
        assert_eq!(
            call_at(&doc, XPathNode::Node(root), "number", vec![]),
            XPathValue::Number(12.5)
        );
    }
}
