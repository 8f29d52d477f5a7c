use jform::{ListCommand, ListOutcome, Node, SchemaError, build};
use serde_json::{Value, json};

fn order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "customer": {"type": "string"},
            "placed": {"type": "string", "format": "date"},
            "priority": {"type": "string", "enum": ["low", "normal", "urgent"]},
            "lines": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sku": {"type": "string"},
                        "qty": {"type": "integer"},
                        "price": {"type": "number"}
                    },
                    "required": ["sku", "qty"]
                }
            },
            "tags": {"type": "array", "items": {"enum": ["gift", "fragile"]}}
        },
        "required": ["customer"]
    })
}

fn lines(node: &mut Node) -> &mut jform::ListNode {
    node.get_mut_by_key("lines")
        .and_then(Node::as_list_mut)
        .unwrap()
}

#[test]
fn test_object_round_trip() {
    let mut node = build(&order_schema()).unwrap();
    let value = json!({
        "customer": "ACME",
        "placed": "2024-05-01",
        "priority": "urgent",
        "lines": [
            {"sku": "A-1", "qty": 2, "price": 9.5},
            {"sku": "B-7", "qty": 1, "price": 120}
        ],
        "tags": ["fragile"]
    });
    node.set_value(&value).unwrap();
    assert_eq!(node.value(), value);

    let keys: Vec<_> = node.value().as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["customer", "placed", "priority", "lines", "tags"]);
}

#[test]
fn test_initial_value() {
    let node = build(&order_schema()).unwrap();
    assert_eq!(
        node.value(),
        json!({
            "customer": "",
            "placed": "",
            "priority": null,
            "lines": [],
            "tags": []
        })
    );
    assert!(node.is_empty());
}

#[test]
fn test_list_lifecycle() {
    let mut node = build(&order_schema()).unwrap();
    let list = lines(&mut node);

    assert!(list.add_item(None).unwrap());
    assert!(!list.add_item(None).unwrap());
    assert_eq!(list.len(), 1);

    list.item_mut(0)
        .unwrap()
        .set_value(&json!({"sku": "A", "qty": 1, "price": 1}))
        .unwrap();
    for sku in ["B", "C", "D", "E"] {
        let outcome = list
            .apply(ListCommand::AddItemRequested(Some(
                json!({"sku": sku, "qty": 1, "price": 1}),
            )))
            .unwrap();
        assert!(matches!(outcome, ListOutcome::Added { .. }));
    }
    assert_eq!(list.len(), 5);

    for index in [0, 2, 3] {
        list.apply(ListCommand::SetSelected {
            index,
            selected: true,
        })
        .unwrap();
    }
    assert_eq!(
        list.apply(ListCommand::RemoveSelectedRequested).unwrap(),
        ListOutcome::Removed { count: 3 }
    );
    let skus: Vec<_> = list
        .value()
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["sku"].clone())
        .collect();
    assert_eq!(skus, vec![json!("B"), json!("E")]);

    assert!(matches!(
        list.remove_item(2),
        Err(SchemaError::IndexOutOfRange { index: 2, len: 2, .. })
    ));
    list.remove_item(0).unwrap();
    assert_eq!(list.value()[0]["sku"], json!("E"));
}

#[test]
fn test_failed_write_leaves_tree_untouched() {
    let mut node = build(&order_schema()).unwrap();
    node.set_value(&json!({"customer": "ACME", "lines": [{"sku": "A", "qty": 1}]}))
        .unwrap();
    let before = node.value();

    for bad in [
        json!({"customer": "X", "priority": "someday"}),
        json!({"customer": "X", "lines": [{"sku": "B", "qty": 1.5}]}),
        json!({"customer": "X", "discount": 3}),
        json!({"customer": "X", "placed": "01/05/2024"}),
        json!({"customer": "X", "tags": ["gift", "heavy"]}),
    ] {
        assert!(node.set_value(&bad).is_err(), "{bad}");
        assert_eq!(node.value(), before);
    }
}

#[test]
fn test_required_flags() {
    let node = build(&order_schema()).unwrap();
    assert!(node.get_by_key("customer").unwrap().base().required);
    assert!(!node.get_by_key("placed").unwrap().base().required);

    let line = node.as_object().unwrap().child("lines").unwrap().as_list().unwrap();
    assert!(line.items().is_empty());
    assert_eq!(line.item_schema()["required"], json!(["sku", "qty"]));
}

#[test]
fn test_read_only_inside_list_item() {
    let mut node = build(&json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": {"type": "string", "readOnly": true, "default": "auto"},
                "note": {"type": "string"}
            }
        }
    }))
    .unwrap();
    let list = node.as_list_mut().unwrap();
    assert!(list.add_item(Some(&json!({"note": "first"}))).unwrap());
    assert_eq!(list.value(), json!([{"id": "auto", "note": "first"}]));

    assert!(matches!(
        list.add_item(Some(&json!({"id": "mine"}))),
        Err(SchemaError::ReadOnlyViolation { path }) if path == "$[].id"
    ));
    assert_eq!(list.len(), 1);
}
