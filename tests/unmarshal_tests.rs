mod common;

use atlas_tok::{
    from_tokens, to_tokens, value, Atlas, Error, ErrorCategory, Map, Options, Slot, Token,
    TokenKind, UnknownKeys, Unmarshaller, Value,
};
use common::{
    endpoint_atlas, sample_order, sample_user, unmarshal_all, user_tokens, Endpoint, Order, User,
};
use std::collections::{BTreeMap, HashMap, VecDeque};

#[test]
fn test_user_from_fixture() {
    let atlas = Atlas::new();
    let mut user = User::default();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut user).unwrap();
    unmarshal_all(&mut u, user_tokens());
    drop(u);
    assert_eq!(user, sample_user());
}

#[test]
fn test_order_round_trip() {
    let atlas = Atlas::new();
    let order = sample_order();
    let tokens = to_tokens(&atlas, &order).unwrap();
    let back: Order = from_tokens(&atlas, tokens).unwrap();
    assert_eq!(back, order);
}

#[test]
fn test_string_scenario_destinations() {
    let atlas = Atlas::new();
    let tokens = vec![Token::String("value".into())];

    // Addressable string.
    let mut s = String::new();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut s).unwrap();
    unmarshal_all(&mut u, tokens.clone());
    drop(u);
    assert_eq!(s, "value");

    // Value copy of a string.
    let mut u = Unmarshaller::new(&atlas);
    let err = u.bind(Slot::detached(String::new())).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidUnmarshalTarget {
            type_name: std::any::type_name::<String>()
        }
    );
    assert_eq!(err.category(), ErrorCategory::Bind);

    // Value copy of a wildcard.
    let err = u.bind(Slot::detached(Value::Null)).unwrap_err();
    assert!(matches!(err, Error::Unsettable { .. }));
    assert_eq!(err.category(), ErrorCategory::Bind);

    // Maps and sequences, addressable or not, fail on the scalar itself.
    let mut map: HashMap<String, String> = HashMap::new();
    let mut boxed_map: Option<Box<HashMap<String, String>>> = None;
    let mut seq: Vec<String> = Vec::new();
    let mut boxed_seq: Box<Option<Vec<String>>> = Box::default();
    let slots: Vec<(Slot<'_>, &str)> = vec![
        (Slot::addr(&mut map), "map open"),
        (Slot::detached(HashMap::<String, String>::new()), "map open"),
        (Slot::addr(&mut boxed_map), "map open"),
        (Slot::addr(&mut seq), "array open"),
        (Slot::detached(Vec::<String>::new()), "array open"),
        (Slot::addr(&mut boxed_seq), "array open"),
    ];
    for (slot, expected) in slots {
        let mut u = Unmarshaller::new(&atlas);
        u.bind(slot).unwrap();
        let err = u.step(tokens[0].clone()).unwrap_err();
        assert_eq!(err, Error::incompatible(expected, TokenKind::String));
        assert_eq!(err.category(), ErrorCategory::Step);
    }
}

#[test]
fn test_addressable_wildcard_accepts_natural_shapes() {
    let atlas = Atlas::new();
    let cases = vec![
        (vec![Token::String("value".into())], Value::from("value")),
        (vec![Token::Float(0.5)], Value::Float(0.5)),
        (
            vec![Token::ArrOpen(None), Token::Int(1), Token::ArrClose],
            value!([1]),
        ),
        (
            vec![
                Token::MapOpen(None),
                Token::Key("k".into()),
                Token::Bytes(vec![0, 1]),
                Token::MapClose,
            ],
            Value::Map([("k".to_string(), Value::Bytes(vec![0, 1]))].into_iter().collect()),
        ),
    ];
    for (tokens, expected) in cases {
        let mut v = Value::Null;
        let mut u = Unmarshaller::new(&atlas);
        u.bind(&mut v).unwrap();
        unmarshal_all(&mut u, tokens);
        drop(u);
        assert_eq!(v, expected);
    }
}

#[test]
fn test_wildcard_rejects_key_token() {
    let atlas = Atlas::new();
    let mut v = Value::Null;
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut v).unwrap();
    assert_eq!(
        u.step(Token::Key("k".into())),
        Err(Error::incompatible("value", TokenKind::Key))
    );
}

#[test]
fn test_registered_record_with_skip_override() {
    let atlas = endpoint_atlas();
    let mut endpoint = Endpoint::default();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(Slot::addr_registered(&mut endpoint)).unwrap();
    unmarshal_all(
        &mut u,
        vec![
            Token::MapOpen(Some(3)),
            Token::Key("legacy".into()),
            Token::ArrOpen(Some(1)),
            Token::MapOpen(Some(0)),
            Token::MapClose,
            Token::ArrClose,
            Token::Key("targetUrl".into()),
            Token::String("https://example.test".into()),
            Token::Key("maxRetries".into()),
            Token::Int(4),
            Token::MapClose,
        ],
    );
    drop(u);
    assert_eq!(
        endpoint,
        Endpoint {
            url: "https://example.test".into(),
            retries: 4,
        }
    );
}

#[test]
fn test_engine_wide_unknown_key_policy() {
    let atlas = Atlas::new();
    let tokens = vec![
        Token::MapOpen(None),
        Token::Key("nickname".into()),
        Token::String("Al".into()),
        Token::Key("id".into()),
        Token::Uint(9),
        Token::MapClose,
    ];

    let mut user = User::default();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut user).unwrap();
    u.step(tokens[0].clone()).unwrap();
    let err = u.step(tokens[1].clone()).unwrap_err();
    assert!(matches!(err, Error::UnknownKey { ref key, .. } if key == "nickname"));
    drop(u);

    let mut lenient = Unmarshaller::new(&atlas)
        .with_options(Options::new().with_unknown_keys(UnknownKeys::Skip));
    lenient.bind(&mut user).unwrap();
    unmarshal_all(&mut lenient, tokens);
    drop(lenient);
    assert_eq!(user.id, 9);
}

#[test]
fn test_missing_fields_keep_defaults() {
    let atlas = Atlas::new();
    let user: User = from_tokens(
        &atlas,
        vec![
            Token::MapOpen(None),
            Token::Key("name".into()),
            Token::String("Bob".into()),
            Token::MapClose,
        ],
    )
    .unwrap();
    assert_eq!(
        user,
        User {
            name: "Bob".into(),
            ..User::default()
        }
    );
}

#[test]
fn test_container_variants() {
    let atlas = Atlas::new();
    let tokens = vec![
        Token::MapOpen(None),
        Token::Key("z".into()),
        Token::ArrOpen(None),
        Token::Uint(1),
        Token::Uint(2),
        Token::ArrClose,
        Token::Key("a".into()),
        Token::ArrOpen(None),
        Token::ArrClose,
        Token::MapClose,
    ];

    let tree: BTreeMap<String, VecDeque<u8>> = from_tokens(&atlas, tokens.clone()).unwrap();
    assert_eq!(tree["z"], VecDeque::from(vec![1, 2]));

    let ordered: indexmap::IndexMap<String, Vec<i64>> = from_tokens(&atlas, tokens.clone()).unwrap();
    let keys: Vec<_> = ordered.keys().cloned().collect();
    assert_eq!(keys, vec!["z", "a"]);

    let wild: Map = from_tokens(&atlas, tokens).unwrap();
    assert_eq!(wild.get("z"), Some(&value!([1u64, 2u64])));
}

#[test]
fn test_rebind_after_failure() {
    let atlas = Atlas::new();
    let mut first = 0i16;
    let mut second = 0i16;
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut first).unwrap();
    assert!(u.step(Token::Bool(true)).is_err());
    assert_eq!(u.step(Token::Int(1)), Err(Error::NotBound));
    u.bind(&mut second).unwrap();
    assert!(u.step(Token::Int(-7)).unwrap());
    drop(u);
    assert_eq!((first, second), (0, -7));
}

#[test]
fn test_deep_wildcard_input() {
    let depth = 2_000;
    let mut tokens = vec![Token::ArrOpen(None); depth];
    tokens.push(Token::Null);
    tokens.extend(std::iter::repeat(Token::ArrClose).take(depth));

    let atlas = Atlas::new();
    let mut v = Value::Null;
    let mut u = Unmarshaller::new(&atlas).with_options(Options::new().without_max_depth());
    u.bind(&mut v).unwrap();
    unmarshal_all(&mut u, tokens);
    drop(u);

    let mut cursor = &v;
    let mut levels = 0;
    while let Value::Array(items) = cursor {
        levels += 1;
        cursor = &items[0];
    }
    assert_eq!(levels, depth);
    assert!(cursor.is_null());
}

#[test]
fn test_skipped_subtree_must_be_well_formed() {
    let atlas = endpoint_atlas();
    let mut endpoint = Endpoint::default();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(Slot::addr_registered(&mut endpoint)).unwrap();

    // { "junk": [ "nonsense": } ... : a key inside an array, closed as a map.
    u.step(Token::MapOpen(None)).unwrap();
    u.step(Token::Key("junk".into())).unwrap();
    u.step(Token::ArrOpen(None)).unwrap();
    let err = u.step(Token::Key("nonsense".into())).unwrap_err();
    assert_eq!(err, Error::incompatible("value", TokenKind::Key));
    assert_eq!(err.category(), ErrorCategory::Step);
    assert_eq!(u.step(Token::MapClose), Err(Error::NotBound));
    drop(u);
    assert_eq!(endpoint, Endpoint::default());
}
