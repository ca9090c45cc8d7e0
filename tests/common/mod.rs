//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use atlas_tok::{Atlas, AtlasEntry, Marshaller, Natural, Token, UnknownKeys, Unmarshaller, Value};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub active: bool,
    pub tags: Vec<String>,
}

impl Natural for User {
    fn natural() -> AtlasEntry {
        AtlasEntry::record::<User>()
            .field("id", |u| &u.id, |u, v| u.id = v)
            .field("name", |u| &u.name, |u, v| u.name = v)
            .field("active", |u| &u.active, |u, v| u.active = v)
            .field("tags", |u| &u.tags, |u, v| u.tags = v)
            .build()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Product {
    pub sku: String,
    pub price: f64,
    pub quantity: u32,
}

impl Natural for Product {
    fn natural() -> AtlasEntry {
        AtlasEntry::record::<Product>()
            .field("sku", |p| &p.sku, |p, v| p.sku = v)
            .field("price", |p| &p.price, |p, v| p.price = v)
            .field("quantity", |p| &p.quantity, |p, v| p.quantity = v)
            .build()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub customer: User,
    pub items: Vec<Product>,
    pub notes: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    pub placed: Option<DateTime<Utc>>,
}

impl Natural for Order {
    fn natural() -> AtlasEntry {
        AtlasEntry::record::<Order>()
            .field("order_id", |o| &o.order_id, |o, v| o.order_id = v)
            .field("customer", |o| &o.customer, |o, v| o.customer = v)
            .field("items", |o| &o.items, |o, v| o.items = v)
            .field("notes", |o| &o.notes, |o, v| o.notes = v)
            .omit_if(|o| o.notes.is_none())
            .field("attributes", |o| &o.attributes, |o, v| o.attributes = v)
            .field("placed", |o| &o.placed, |o, v| o.placed = v)
            .build()
    }
}

/// A record with no natural mapping; it only exists through registration.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub retries: u8,
}

/// Registers `Endpoint` with camel-cased keys and a lenient key policy.
pub fn endpoint_atlas() -> Atlas {
    Atlas::builder()
        .register(
            AtlasEntry::record::<Endpoint>()
                .field("targetUrl", |e| &e.url, |e, v| e.url = v)
                .field("maxRetries", |e| &e.retries, |e, v| e.retries = v)
                .unknown_keys(UnknownKeys::Skip)
                .build(),
        )
        .build()
        .expect("endpoint atlas")
}

pub fn sample_user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        active: true,
        tags: vec!["admin".to_string(), "developer".to_string()],
    }
}

pub fn sample_order() -> Order {
    let mut attributes = BTreeMap::new();
    attributes.insert("gift".to_string(), Value::Bool(true));
    attributes.insert("channel".to_string(), Value::from("web"));
    Order {
        order_id: 12345,
        customer: sample_user(),
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 49.5,
                quantity: 1,
            },
        ],
        notes: None,
        attributes,
        placed: Some(
            DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
                .expect("fixture date")
                .with_timezone(&Utc),
        ),
    }
}

/// The token stream of [`sample_user`], as a format decoder would store it.
pub const USER_TOKENS_JSON: &str = r#"[
    {"MapOpen": 4},
    {"Key": "id"}, {"Uint": 123},
    {"Key": "name"}, {"String": "Alice"},
    {"Key": "active"}, {"Bool": true},
    {"Key": "tags"}, {"ArrOpen": 2}, {"String": "admin"}, {"String": "developer"}, "ArrClose",
    "MapClose"
]"#;

pub fn user_tokens() -> Vec<Token> {
    serde_json::from_str(USER_TOKENS_JSON).expect("fixture tokens")
}

/// Steps a marshaller to completion, asserting that `done` is reported
/// exactly on the last token.
pub fn marshal_all(m: &mut Marshaller<'_>) -> Vec<Token> {
    let mut tokens = Vec::new();
    loop {
        let (tok, done) = m.step().expect("marshal step");
        tokens.push(tok);
        if done {
            return tokens;
        }
    }
}

/// Feeds every token, asserting completion only on the last one.
pub fn unmarshal_all(u: &mut Unmarshaller<'_>, tokens: Vec<Token>) {
    let last = tokens.len().saturating_sub(1);
    for (i, tok) in tokens.into_iter().enumerate() {
        let done = u.step(tok).expect("unmarshal step");
        assert_eq!(done, i == last, "completion reported at token {}", i);
    }
}
