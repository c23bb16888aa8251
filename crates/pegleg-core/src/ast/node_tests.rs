use super::*;

#[test]
fn name_without_capture_counts_as_name() {
    let n = Node::Name(NameNode { name: "Expr".into(), capture: None });
    assert_eq!(n.kind(), NodeKind::Name);
}

#[test]
fn name_with_capture_counts_as_variable() {
    let n = Node::Name(NameNode {
        name: "Expr".into(),
        capture: Some(VariableId(0)),
    });
    assert_eq!(n.kind(), NodeKind::Variable);
}

#[test]
fn token_kinds_map_to_matching_node_kind() {
    assert_eq!(Node::Token(TokenNode::dot()).kind(), NodeKind::Dot);
    assert_eq!(Node::Token(TokenNode::commit()).kind(), NodeKind::Commit);
    assert_eq!(Node::Token(TokenNode::nil()).kind(), NodeKind::Nil);
    assert_eq!(
        Node::Token(TokenNode::character("a")).kind(),
        NodeKind::Character
    );
}

#[test]
fn list_kinds_map_to_matching_node_kind() {
    let seq = Node::List(ListNode { kind: ListKind::Sequence, items: vec![] });
    assert_eq!(seq.kind(), NodeKind::Sequence);
    let alt = Node::List(ListNode { kind: ListKind::UnorderedAlternate, items: vec![] });
    assert_eq!(alt.kind(), NodeKind::UnorderedAlternate);
}

#[test]
fn children_returns_list_items_only() {
    let leaf = Node::Token(TokenNode::dot());
    assert!(leaf.children().is_empty());

    let list = Node::List(ListNode {
        kind: ListKind::Sequence,
        items: vec![Node::Token(TokenNode::dot()), Node::Token(TokenNode::nil())],
    });
    assert_eq!(list.children().len(), 2);
}
