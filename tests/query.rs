use locatedxml::xpath::EvaluateError;
use locatedxml::{
    evaluate, ConfigurationError, LocatedDocument, LocationKind, NamespaceContext, QueryCache,
    QueryError, RuleRegistry, XPathCheck, XPathNode, XPathQuery, XPathValue, DOCUMENT_NODE,
};
use pretty_assertions::assert_eq;

const POM: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:x="urn:extra">
  <dependencies>
    <dependency scope="test"><artifactId>junit</artifactId><version>4.12</version></dependency>
    <dependency><artifactId>guava</artifactId><version>31.1</version></dependency>
    <x:note x:level="2">pinned</x:note>
  </dependencies>
  <!-- build -->
  <?build fast?>
</project>"#;

const POM_NS: &str = "http://maven.apache.org/POM/4.0.0";

fn slices(doc: &LocatedDocument, value: &XPathValue) -> Vec<String> {
    value
        .as_nodeset()
        .unwrap()
        .iter()
        .map(|node| {
            let range = node.report_range(&doc.aware()).unwrap();
            doc.slice(range).to_string()
        })
        .collect()
}

#[test]
fn aware_view_needs_bound_prefixes() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let view = doc.aware();

    // Unprefixed names only match elements in no namespace
    let plain = XPathQuery::compile("//dependency").unwrap();
    assert_eq!(plain.evaluate(&view, DOCUMENT_NODE).unwrap(), XPathValue::empty_nodeset());

    let namespaces = NamespaceContext::new().with("m", POM_NS);
    let query = XPathQuery::compile_with_namespaces("//m:dependency[@scope='test']/m:artifactId", &namespaces).unwrap();
    let value = query.evaluate(&view, DOCUMENT_NODE).unwrap();
    assert_eq!(slices(&doc, &value), vec!["<artifactId>"]);
}

#[test]
fn unaware_view_matches_qualified_names() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let view = doc.unaware();
    let count = evaluate("count(//dependency)", DOCUMENT_NODE, &view).unwrap();
    assert_eq!(count, XPathValue::Number(2.0));

    let notes = evaluate("//x:note/@x:level", DOCUMENT_NODE, &view).unwrap();
    assert_eq!(slices(&doc, &notes), vec!["x:level=\"2"]);

    // xmlns attributes are ordinary attributes here
    let xmlns = evaluate("count(/project/@*)", DOCUMENT_NODE, &view).unwrap();
    assert_eq!(xmlns, XPathValue::Number(2.0));
    let hidden = evaluate("count(/*/@*)", DOCUMENT_NODE, &doc.aware()).unwrap();
    assert_eq!(hidden, XPathValue::Number(0.0));
}

#[test]
fn results_in_document_order_without_duplicates() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let view = doc.unaware();
    let value = evaluate(
        "//version | //artifactId | //dependency/*[1] | //comment() | //processing-instruction('build')",
        DOCUMENT_NODE,
        &view,
    )
    .unwrap();
    assert_eq!(
        slices(&doc, &value),
        vec![
            "<artifactId>",
            "<version>",
            "<artifactId>",
            "<version>",
            "<!-- build -->",
            "<?build fast?>",
        ]
    );
    let nodes = value.as_nodeset().unwrap();
    assert!(nodes.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn scalar_results() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let view = doc.unaware();
    let run = |xpath: &str| evaluate(xpath, DOCUMENT_NODE, &view).unwrap();

    assert_eq!(run("sum(//version[. < 10])"), XPathValue::Number(4.12));
    assert_eq!(run("string(//dependency[2]/artifactId)"), XPathValue::from("guava"));
    assert_eq!(run("boolean(//dependency[@scope])"), XPathValue::Boolean(true));
    assert_eq!(
        run("concat(name(/*), ':', local-name(//x:note))"),
        XPathValue::from("project:x:note")
    );
    assert_eq!(run("normalize-space(//x:note)"), XPathValue::from("pinned"));
    assert_eq!(run("//dependency[last()]/version > 30"), XPathValue::Boolean(true));
}

#[test]
fn evaluation_from_a_context_node() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let view = doc.unaware();
    let junit = evaluate("//dependency[1]", DOCUMENT_NODE, &view).unwrap();
    let context = junit.as_nodeset().unwrap()[0];

    let sibling = evaluate("following-sibling::*[1]/artifactId", context, &view).unwrap();
    assert_eq!(slices(&doc, &sibling), vec!["<artifactId>"]);
    assert_eq!(
        evaluate("string(following-sibling::*[1]/artifactId)", context, &view).unwrap(),
        XPathValue::from("guava")
    );

    let attr = evaluate("@scope", context, &view).unwrap();
    let attr_node = attr.as_nodeset().unwrap()[0];
    assert!(matches!(attr_node, XPathNode::Attribute { .. }));
    assert_eq!(
        evaluate("name(..)", attr_node, &view).unwrap(),
        XPathValue::from("dependency")
    );
}

#[test]
fn attribute_results_carry_ranges() {
    let doc = LocatedDocument::parse(POM).unwrap();
    let value = evaluate("//@scope", DOCUMENT_NODE, &doc.unaware()).unwrap();
    let XPathNode::Attribute { attr, .. } = value.as_nodeset().unwrap()[0] else {
        panic!("expected an attribute");
    };
    let name = doc.attribute_range(attr, LocationKind::Name).unwrap();
    let val = doc.attribute_range(attr, LocationKind::Value).unwrap();
    assert_eq!(doc.slice(name), "scope");
    assert_eq!(doc.slice(val), "test");
    assert_eq!(name.start.line, 3);
}

#[test]
fn malformed_expressions_fail_to_compile() {
    for expression in ["//", "a[", "a]", "count(", "@", "1 +", "a b", "'open", "!x"] {
        match XPathQuery::compile(expression) {
            Err(ConfigurationError::InvalidExpression { expression: e, .. }) => {
                assert_eq!(e, expression)
            }
            other => panic!("{expression}: unexpected {other:?}"),
        }
    }
}

#[test]
fn runtime_errors() {
    let doc = LocatedDocument::parse("<r/>").unwrap();
    let view = doc.aware();
    let err = |xpath: &str| match evaluate(xpath, DOCUMENT_NODE, &view) {
        Err(EvaluateError::Query(err)) => err,
        other => panic!("{xpath}: unexpected {other:?}"),
    };
    assert_eq!(err("nope()"), QueryError::UnknownFunction("nope".to_string()));
    assert_eq!(err("id('a')"), QueryError::Unsupported("id".to_string()));
    assert!(matches!(err("substring('a')"), QueryError::Arity { found: 1, .. }));
    assert!(matches!(err("count(1)"), QueryError::Type { .. }));
    assert_eq!(err("$v"), QueryError::UnknownVariable("v".to_string()));
}

#[test]
fn cache_shares_compiled_queries() {
    let cache = QueryCache::new(8);
    let namespaces = NamespaceContext::new().with("m", POM_NS);
    let a = cache.get_or_compile("//m:version", &namespaces).unwrap();
    let b = cache.get_or_compile("//m:version", &namespaces).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));

    let doc = LocatedDocument::parse(POM).unwrap();
    let value = a.evaluate(&doc.aware(), DOCUMENT_NODE).unwrap();
    assert_eq!(value.as_nodeset().unwrap().len(), 2);
}

#[test]
fn doctype_is_outside_the_data_model() {
    let doc = LocatedDocument::parse("<!DOCTYPE a>\n<a><b/></a>").unwrap();
    let view = doc.unaware();
    assert_eq!(
        evaluate("count(/node())", DOCUMENT_NODE, &view).unwrap(),
        XPathValue::Number(1.0)
    );
    assert_eq!(
        evaluate("count(//node())", DOCUMENT_NODE, &view).unwrap(),
        XPathValue::Number(2.0)
    );

    let mut registry = RuleRegistry::new();
    registry
        .register(Box::new(XPathCheck::new("any-node", "/node()").unwrap()))
        .unwrap();
    let reported: Vec<_> = registry
        .scan("a.xml", &doc)
        .iter()
        .map(|issue| doc.slice(issue.range().unwrap()).to_string())
        .collect();
    assert_eq!(reported, vec!["<a>"]);
}
