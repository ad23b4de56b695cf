use locatedxml::{
    LocatedDocument, Locatable, LocationKind, NodeKind, ParseError, Position, Range, DOCUMENT_NODE,
};
use pretty_assertions::assert_eq;

fn range(doc: &LocatedDocument, id: u32, kind: LocationKind) -> Range {
    doc.range(id, kind).unwrap()
}

fn span(r: Range) -> ((usize, usize), (usize, usize)) {
    ((r.start.line, r.start.column), (r.end.line, r.end.column))
}

fn elements(doc: &LocatedDocument) -> Vec<u32> {
    doc.descendants(DOCUMENT_NODE)
        .filter(|&id| doc.kind(id) == Some(NodeKind::Element))
        .collect()
}

const MIXED: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE root>\n\
<root xmlns:p=\"urn:p\" a='1'>\n\
  <p:child  b = \"two\"\n     c='3'/>\n\
  <empty></empty>\n\
  text &amp; more\n\
  <!-- note -->\n\
  <![CDATA[ <raw> ]]>\n\
  <?target some data?>\n\
  <ünï attr=\"värde\">ö</ünï>\n\
</root>\n";

#[test]
fn foo_element_ranges() {
    let doc = LocatedDocument::parse("<foo attr=\"1\">\n </foo>").unwrap();
    let foo = doc.root_element().unwrap();
    assert_eq!(span(range(&doc, foo, LocationKind::Name)), ((1, 1), (1, 4)));
    assert_eq!(span(range(&doc, foo, LocationKind::Start)), ((1, 0), (1, 14)));
    assert_eq!(span(range(&doc, foo, LocationKind::End)), ((2, 1), (2, 7)));
    assert_eq!(span(range(&doc, foo, LocationKind::Node)), ((1, 0), (2, 7)));
}

#[test]
fn start_and_end_bound_every_element() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    for id in elements(&doc) {
        let node = range(&doc, id, LocationKind::Node);
        let start = range(&doc, id, LocationKind::Start);
        let end = range(&doc, id, LocationKind::End);
        assert_eq!(start.start, node.start, "{}", doc.name(id));
        assert_eq!(end.end, node.end, "{}", doc.name(id));
    }
}

#[test]
fn self_closing_start_equals_end() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    let child = elements(&doc)
        .into_iter()
        .find(|&id| doc.name(id) == "p:child")
        .unwrap();
    let start = range(&doc, child, LocationKind::Start);
    assert_eq!(start, range(&doc, child, LocationKind::End));
    assert!(doc.slice(start).ends_with("/>"));
    assert_eq!(start.start.line, 4);
    assert_eq!(start.end.line, 5);

    let empty = elements(&doc)
        .into_iter()
        .find(|&id| doc.name(id) == "empty")
        .unwrap();
    assert_eq!(doc.slice(range(&doc, empty, LocationKind::Start)), "<empty>");
    assert_eq!(doc.slice(range(&doc, empty, LocationKind::End)), "</empty>");
}

#[test]
fn attribute_values_exclude_quotes() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    let mut seen = Vec::new();
    for id in elements(&doc) {
        for aid in doc.attribute_ids(id) {
            let name = doc.attribute_range(aid, LocationKind::Name).unwrap();
            let value = doc.attribute_range(aid, LocationKind::Value).unwrap();
            let before = &doc.source()[..value.start.offset];
            let after = &doc.source()[value.end.offset..];
            assert!(before.ends_with(['"', '\'']));
            assert!(after.starts_with(['"', '\'']));
            seen.push((doc.slice(name).to_string(), doc.slice(value).to_string()));
        }
    }
    assert_eq!(
        seen,
        vec![
            ("xmlns:p".to_string(), "urn:p".to_string()),
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "two".to_string()),
            ("c".to_string(), "3".to_string()),
            ("attr".to_string(), "värde".to_string()),
        ]
    );
}

#[test]
fn every_range_slices_its_construct() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    for id in doc.descendants(DOCUMENT_NODE) {
        let node = doc.slice(range(&doc, id, LocationKind::Node));
        match doc.kind(id).unwrap() {
            NodeKind::Element => {
                assert!(node.starts_with(&format!("<{}", doc.name(id))));
                assert!(node.ends_with('>'));
                assert_eq!(doc.slice(range(&doc, id, LocationKind::Name)), doc.name(id));
            }
            NodeKind::Comment => assert_eq!(node, "<!-- note -->"),
            NodeKind::CData => {
                assert_eq!(node, "<![CDATA[ <raw> ]]>");
                assert_eq!(doc.slice(range(&doc, id, LocationKind::Start)), "<![CDATA[");
                assert_eq!(doc.slice(range(&doc, id, LocationKind::End)), "]]>");
                assert_eq!(doc.value(id), " <raw> ");
            }
            NodeKind::ProcessingInstruction => {
                assert_eq!(node, "<?target some data?>");
                assert_eq!(doc.name(id), "target");
                assert_eq!(doc.value(id), "some data");
            }
            NodeKind::DocType => assert_eq!(node, "<!DOCTYPE root>"),
            NodeKind::Text => assert!(!node.is_empty()),
            NodeKind::Document => unreachable!("document node is not a descendant"),
        }
    }
}

#[test]
fn multibyte_columns_count_characters() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    let uni = elements(&doc)
        .into_iter()
        .find(|&id| doc.name(id) == "ünï")
        .unwrap();
    let start = range(&doc, uni, LocationKind::Start);
    assert_eq!(doc.slice(start), "<ünï attr=\"värde\">");
    assert_eq!(start.end.column - start.start.column, 18);
    assert_eq!(start.end.offset - start.start.offset, 21);
}

#[test]
fn long_text_end_column() {
    let source = format!("<tag>{}</tag>", "a".repeat(200));
    let doc = LocatedDocument::parse(&source).unwrap();
    let tag = doc.root_element().unwrap();
    let text = doc.children(tag).next().unwrap();
    assert_eq!(doc.kind(text), Some(NodeKind::Text));
    assert_eq!(range(&doc, text, LocationKind::Node).end.column, 205);
}

#[test]
fn standard_entity_is_decoded() {
    let doc = LocatedDocument::parse("<a>&lt;</a>").unwrap();
    let a = doc.root_element().unwrap();
    let children: Vec<_> = doc.children(a).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(doc.value(children[0]), "<");
    assert_eq!(doc.slice(range(&doc, children[0], LocationKind::Node)), "&lt;");
}

#[test]
fn unknown_entity_fails_with_position() {
    let err = LocatedDocument::parse("<a>&ouml;</a>").unwrap_err();
    match err {
        ParseError::UndeclaredEntity { name, position } => {
            assert_eq!(name, "ouml");
            assert_eq!(position, Position::new(1, 3, 3));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn doctype_then_sibling_element() {
    let doc = LocatedDocument::parse("<!DOCTYPE foo> <tag/>").unwrap();
    let children: Vec<_> = doc.children(DOCUMENT_NODE).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(doc.kind(children[0]), Some(NodeKind::DocType));
    assert_eq!(doc.slice(range(&doc, children[0], LocationKind::Node)), "<!DOCTYPE foo>");
    assert_eq!(doc.kind(children[1]), Some(NodeKind::Element));
    assert_eq!(doc.name(children[1]), "tag");
}

#[test]
fn prolog_attribute() {
    let source = "<?xml version=\"1.0\"?><tag/>";
    let doc = LocatedDocument::parse(source).unwrap();
    let prolog = doc.prolog().unwrap();
    assert_eq!(prolog.attributes.len(), 1);
    let version = &prolog.attributes[0];
    assert_eq!(version.name, "version");
    assert_eq!(version.value, "1.0");
    assert!(!version.name_range.overlaps(&version.value_range));
    assert_eq!(version.name_range.slice(source), "version");
    assert_eq!(version.value_range.slice(source), "1.0");
    assert_eq!(prolog.start.slice(source), "<?xml");
    assert_eq!(prolog.end.slice(source), "?>");
}

#[test]
fn views_share_ranges() {
    let doc = LocatedDocument::parse(MIXED).unwrap();
    let root = doc.root_element().unwrap();
    let located = doc.location(Locatable::Node(root), LocationKind::Start);
    assert_eq!(located, doc.range(root, LocationKind::Start));
    assert_eq!(doc.line_of(root), Some(3));
}

#[test]
fn structural_errors() {
    for source in [
        "<a/><b/>",
        "text<a/>",
        "<a></b>",
        "<a>",
        "<a b='<'/>",
        "<a b='&'/>",
        "<p:a/>",
        "<a>&#xZZ;</a>",
    ] {
        assert!(LocatedDocument::parse(source).is_err(), "{source}");
    }
}
