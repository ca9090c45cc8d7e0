use atlas_tok::{from_value, to_tokens, value, Atlas, Map, Token, Value};

#[test]
fn test_value_macro_null() {
    let value = value!(null);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_value_macro_booleans() {
    assert_eq!(value!(true), Value::Bool(true));
    assert_eq!(value!(false), Value::Bool(false));
}

#[test]
fn test_value_macro_numbers() {
    assert_eq!(value!(42), Value::Int(42));
    assert_eq!(value!(-123), Value::Int(-123));
    assert_eq!(value!(7u8), Value::Uint(7));
    assert_eq!(value!(3.5), Value::Float(3.5));
}

#[test]
fn test_value_macro_strings() {
    assert_eq!(value!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(value!(""), Value::String(String::new()));
}

#[test]
fn test_value_macro_arrays() {
    assert_eq!(value!([]), Value::Array(vec![]));
    assert_eq!(
        value!([1, "hello", true, null]),
        Value::Array(vec![
            Value::Int(1),
            Value::String("hello".to_string()),
            Value::Bool(true),
            Value::Null,
        ])
    );
}

#[test]
fn test_value_macro_maps_keep_order() {
    assert_eq!(value!({}), Value::Map(Map::new()));

    let v = value!({
        "name": "Alice",
        "age": 30,
        "email": null
    });
    let map = v.as_map().unwrap();
    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "age", "email"]);
    assert_eq!(map.get("age"), Some(&Value::Int(30)));
}

#[test]
fn test_value_macro_nested() {
    let nested = value!({
        "user": {
            "id": 123,
            "name": "Bob",
            "active": true
        },
        "tags": ["admin", "developer"],
        "count": 42
    });

    let obj = nested.as_map().unwrap();
    assert_eq!(obj.len(), 3);

    let user = obj.get("user").and_then(Value::as_map).unwrap();
    assert_eq!(user.get("id"), Some(&Value::Int(123)));
    assert_eq!(user.get("name").and_then(Value::as_str), Some("Bob"));
    assert_eq!(user.get("active").and_then(Value::as_bool), Some(true));

    let tags = obj.get("tags").and_then(Value::as_array).unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[1], Value::from("developer"));
}

#[test]
fn test_value_predicates() {
    let null_val = value!(null);
    assert!(null_val.is_null());
    assert!(!null_val.is_bool());
    assert!(!null_val.is_number());
    assert!(!null_val.is_string());
    assert!(!null_val.is_array());
    assert!(!null_val.is_map());
    assert!(!null_val.is_dyn());

    assert!(value!(1.5).is_number());
    assert_eq!(value!([1, 2, 3]).as_array().map(Vec::len), Some(3));
    assert_eq!(value!({"key": "value"}).as_map().map(Map::len), Some(1));
}

#[test]
fn test_macro_value_marshals_in_insertion_order() {
    let v = value!({ "b": 1, "a": [true] });
    let tokens = to_tokens(&Atlas::new(), &v).unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::MapOpen(Some(2)),
            Token::Key("b".into()),
            Token::Int(1),
            Token::Key("a".into()),
            Token::ArrOpen(Some(1)),
            Token::Bool(true),
            Token::ArrClose,
            Token::MapClose,
        ]
    );
}

#[test]
fn test_macro_value_converts_to_typed() {
    let v = value!({ "x": [1, 2], "y": [] });
    let typed: std::collections::BTreeMap<String, Vec<u16>> = from_value(&Atlas::new(), &v).unwrap();
    assert_eq!(typed["x"], vec![1, 2]);
    assert!(typed["y"].is_empty());
}
