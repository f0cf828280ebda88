//! Values accepted by the cache and their textual renderings

use std::fmt;

/// A value that can be stored in the cache
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Encode the value the way it is written to the backend.
    ///
    /// Integers and floats are stored as decimal text so the backend's
    /// increment and the typed accessors can read them back.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Str(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
            Self::Int(i) => i.to_string().into_bytes(),
            Self::Float(f) => format!("{:?}", f).into_bytes(),
        }
    }

    /// Render the value as it appears inside a recorded argument tuple
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("{:?}", s),
            Self::Bytes(b) => format!("b\"{}\"", b.escape_ascii()),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{:?}", f),
        }
    }

    /// Render the value as a recorded result.
    ///
    /// Strings are recorded bare so a returned key reads as the key itself.
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Short type name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// Positional arguments of an operation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Arguments of a single-parameter call
    pub fn one(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders as a tuple: `()`, `("a",)`, `(1, 2.5)`
impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.0.iter().map(Value::repr).collect();
        match items.len() {
            1 => write!(f, "({},)", items[0]),
            _ => write!(f, "({})", items.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_encoding() {
        assert_eq!(Value::from("hello").to_bytes(), b"hello");
        assert_eq!(Value::from(vec![0u8, 255]).to_bytes(), vec![0u8, 255]);
        assert_eq!(Value::from(42).to_bytes(), b"42");
        assert_eq!(Value::from(-7i64).to_bytes(), b"-7");
        assert_eq!(Value::from(3.0).to_bytes(), b"3.0");
        assert_eq!(Value::from(2.5).to_bytes(), b"2.5");
    }

    #[test]
    fn test_repr() {
        assert_eq!(Value::from("a").repr(), "\"a\"");
        assert_eq!(Value::from("say \"hi\"").repr(), "\"say \\\"hi\\\"\"");
        assert_eq!(Value::from(b"ab\x00".as_slice()).repr(), "b\"ab\\x00\"");
        assert_eq!(Value::from(3).repr(), "3");
        assert_eq!(Value::from(0.1).repr(), "0.1");
    }

    #[test]
    fn test_render_output() {
        assert_eq!(Value::from("some-key").render(), "some-key");
        assert_eq!(Value::from(12).render(), "12");
        assert_eq!(Value::from(b"x".as_slice()).render(), "b\"x\"");
    }

    #[test]
    fn test_args_tuple_rendering() {
        assert_eq!(Args::default().to_string(), "()");
        assert_eq!(Args::one("a").to_string(), "(\"a\",)");
        assert_eq!(Args::one(3).to_string(), "(3,)");
        assert_eq!(
            Args::new(vec![Value::from(1), Value::from(2.5)]).to_string(),
            "(1, 2.5)"
        );
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::one("x");
        assert_eq!(args.len(), 1);
        assert!(!args.is_empty());
        assert_eq!(args.get(0).and_then(Value::as_str), Some("x"));
        assert!(args.get(1).is_none());
        assert!(Args::default().is_empty());
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::from("a").kind(), "str");
        assert_eq!(Value::from(vec![1u8]).kind(), "bytes");
        assert_eq!(Value::from(1).kind(), "int");
        assert_eq!(Value::from(1.5).kind(), "float");
    }
}
