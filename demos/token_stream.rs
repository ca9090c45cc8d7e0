//! Marshalling a record into a toy text format and reading it back.
//!
//! Run with: cargo run --example token_stream

use atlas_tok::{
    pump_marshal, pump_unmarshal, value, Atlas, AtlasEntry, Marshaller, Natural, Token,
    TokenSink, Unmarshaller, Value,
};
use std::error::Error;

#[derive(Debug, Default, PartialEq)]
struct Service {
    name: String,
    port: u16,
    replicas: Vec<String>,
    labels: Value,
}

impl Natural for Service {
    fn natural() -> AtlasEntry {
        AtlasEntry::record::<Service>()
            .field("name", |s| &s.name, |s, v| s.name = v)
            .field("port", |s| &s.port, |s, v| s.port = v)
            .field("replicas", |s| &s.replicas, |s, v| s.replicas = v)
            .field("labels", |s| &s.labels, |s, v| s.labels = v)
            .build()
    }
}

/// An encoder that prints one indented line per token.
struct Outline {
    depth: usize,
    out: String,
}

impl TokenSink for Outline {
    fn emit(&mut self, token: Token) -> atlas_tok::Result<()> {
        if matches!(token, Token::MapClose | Token::ArrClose) {
            self.depth = self.depth.saturating_sub(1);
        }
        self.out.push_str(&"  ".repeat(self.depth));
        self.out.push_str(&token.to_string());
        self.out.push('\n');
        if matches!(token, Token::MapOpen(_) | Token::ArrOpen(_)) {
            self.depth += 1;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let atlas = Atlas::new();
    let service = Service {
        name: "api".to_string(),
        port: 8080,
        replicas: vec!["eu-1".to_string(), "us-2".to_string()],
        labels: value!({ "tier": "web", "canary": false }),
    };

    // Step by hand, one token per call.
    let mut m = Marshaller::new(&atlas);
    m.bind(&service)?;
    let mut outline = Outline {
        depth: 0,
        out: String::new(),
    };
    let count = pump_marshal(&mut m, &mut outline)?;
    println!("Outline ({} tokens):\n{}", count, outline.out);

    // Tokens are serde types, so any serde format can carry them.
    let mut tokens: Vec<Token> = Vec::new();
    m.bind(&service)?;
    pump_marshal(&mut m, &mut tokens)?;
    let json = serde_json::to_string(&tokens)?;
    println!("As JSON:\n{}\n", json);

    // A decoder on the other side feeds them back in.
    let stored: Vec<Token> = serde_json::from_str(&json)?;
    let mut back = Service::default();
    let mut u = Unmarshaller::new(&atlas);
    u.bind(&mut back)?;
    pump_unmarshal(&mut u, &mut stored.into_iter())?;
    drop(u);

    assert_eq!(service, back);
    println!("Round-trip successful");

    Ok(())
}
