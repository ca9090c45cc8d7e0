/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// Array elements and map values are single token trees, so negative
/// numbers and other compound expressions need parentheses.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{value, Value};
///
/// let v = value!({ "name": "Alice", "scores": [1, (-2), 3.5], "extra": null });
/// let map = v.as_map().unwrap();
/// assert_eq!(map.get("name"), Some(&Value::from("Alice")));
/// assert_eq!(map.get("extra"), Some(&Value::Null));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::Map($crate::Map::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut map = $crate::Map::new();
        $(
            map.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::Map(map)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Map, Value};

    #[test]
    fn test_value_macro_primitives() {
        assert_eq!(value!(null), Value::Null);
        assert_eq!(value!(true), Value::Bool(true));
        assert_eq!(value!(42), Value::Int(42));
        assert_eq!(value!(42u64), Value::Uint(42));
        assert_eq!(value!(3.5), Value::Float(3.5));
        assert_eq!(value!("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn test_value_macro_nesting() {
        assert_eq!(value!([]), Value::Array(vec![]));
        assert_eq!(value!({}), Value::Map(Map::new()));

        let v = value!({
            "outer": { "inner": [true, (-1)] },
        });
        let inner = v
            .as_map()
            .and_then(|m| m.get("outer"))
            .and_then(Value::as_map)
            .and_then(|m| m.get("inner"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(inner, &vec![Value::Bool(true), Value::Int(-1)]);
    }

    #[test]
    fn test_value_macro_expressions() {
        let name = String::from("n");
        assert_eq!(value!(name), Value::String("n".to_string()));
        assert_eq!(value!((1 + 2)), Value::Int(3));
    }
}
