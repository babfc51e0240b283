use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Serialize, Serializer};

/// An owned argument or key-value payload of a captured event.
///
/// Values are resolved eagerly into comparable data so that captured events can be
/// compared against expectations written by hand.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Char(char),
    String(String),
    Error(Throwable),
}

impl Value {
    #[must_use]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Captures the [`Display`](fmt::Display) rendering of `value`.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display,
    {
        Self::String(value.to_string())
    }

    /// Captures the [`Debug`](fmt::Debug) rendering of `value`.
    pub fn debug<T>(value: T) -> Self
    where
        T: fmt::Debug,
    {
        Self::String(format!("{value:?}"))
    }

    /// Captures `error` and its chain of sources.
    ///
    /// An error passed as the last argument of a logging call becomes the event's
    /// throwable.
    pub fn error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::Error(Throwable::from_error(error))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_throwable(&self) -> Option<&Throwable> {
        match self {
            Self::Error(throwable) => Some(throwable),
            _ => None,
        }
    }

    /// Signed and unsigned integers widened to one type, so they compare by value.
    fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::I64(value) => Some(i128::from(value)),
            Self::U64(value) => Some(i128::from(value)),
            _ => None,
        }
    }

    /// Converts a value received through the `log` facade.
    pub(crate) fn from_log_value(value: &log::kv::Value<'_>) -> Self {
        if let Some(error) = value.to_borrowed_error() {
            return Self::Error(Throwable::from_error(error));
        }
        if let Some(value) = value.to_bool() {
            return Self::Bool(value);
        }
        if let Some(value) = value.to_i64() {
            return Self::I64(value);
        }
        if let Some(value) = value.to_u64() {
            return Self::U64(value);
        }
        if let Some(value) = value.to_f64() {
            return Self::F64(value);
        }
        if let Some(value) = value.to_char() {
            return Self::Char(value);
        }
        Self::String(value.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I64(_) | Self::U64(_), Self::I64(_) | Self::U64(_)) => {
                self.as_integer() == other.as_integer()
            }
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integers hash by value, so `I64(1)` and `U64(1)` share a bucket.
        if let Some(integer) = self.as_integer() {
            integer.hash(state);
            return;
        }
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null | Self::I64(_) | Self::U64(_) => {}
            Self::Bool(value) => value.hash(state),
            Self::F64(value) => value.to_bits().hash(state),
            Self::Char(value) => value.hash(state),
            Self::String(value) => value.hash(state),
            Self::Error(value) => value.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => value.fmt(f),
            Self::I64(value) => value.fmt(f),
            Self::U64(value) => value.fmt(f),
            Self::F64(value) => value.fmt(f),
            Self::Char(value) => value.fmt(f),
            Self::String(value) => f.write_str(value),
            Self::Error(value) => value.fmt(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::I64(value) => serializer.serialize_i64(*value),
            Self::U64(value) => serializer.serialize_u64(*value),
            Self::F64(value) => serializer.serialize_f64(*value),
            Self::Char(value) => serializer.serialize_char(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Error(value) => value.serialize(serializer),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(<$cast>::from(value))
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool as bool,
    i8 => I64 as i64,
    i16 => I64 as i64,
    i32 => I64 as i64,
    i64 => I64 as i64,
    u8 => U64 as u64,
    u16 => U64 as u64,
    u32 => U64 as u64,
    u64 => U64 as u64,
    f32 => F64 as f64,
    f64 => F64 as f64,
    char => Char as char,
    String => String as String,
    Throwable => Error as Throwable,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        u64::try_from(value).map_or_else(|_| Self::display(value), Self::U64)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::display(value), Self::I64)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// An error captured together with its chain of sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Throwable {
    message: String,
    causes: Vec<String>,
}

impl Throwable {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Messages of the underlying sources, outermost first.
    #[must_use]
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// Renders the error like a stack of causes, one per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        out
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&(dyn std::error::Error + 'static)> for Throwable {
    fn from(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::from_error(error)
    }
}

impl From<&str> for Throwable {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
