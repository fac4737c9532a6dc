//! Keyword arguments passed from a stage to its operation.
//!
//! [`Kwargs`] keeps parameter declaration order. Operations read it through
//! a [`KwargReader`], which type-checks each keyword and, once the
//! operation has taken everything it understands, rejects whatever is left
//! over as an unexpected keyword.

use crate::operation::OperationError;
use crate::param::Value;

/// Ordered `name -> value` keyword map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kwargs(Vec<(String, Value)>);

impl Kwargs {
    /// An empty keyword map.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a keyword, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    /// Look up a keyword by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find_map(|(existing, value)| (existing == name).then_some(value))
    }

    /// Iterate keywords in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of keywords.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keywords are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut kwargs = Self::new();
        for (name, value) in iter {
            kwargs.insert(name, value);
        }
        kwargs
    }
}

/// Typed, consuming reader over a [`Kwargs`] map.
pub struct KwargReader<'a> {
    operation: &'a str,
    kwargs: &'a Kwargs,
    taken: Vec<bool>,
}

impl<'a> KwargReader<'a> {
    /// Start reading `kwargs` on behalf of `operation`.
    #[must_use]
    pub fn new(operation: &'a str, kwargs: &'a Kwargs) -> Self {
        Self {
            operation,
            kwargs,
            taken: vec![false; kwargs.len()],
        }
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.kwargs.0.iter().position(|(existing, _)| existing == name)?;
        self.taken[index] = true;
        Some(self.kwargs.0[index].1)
    }

    fn mismatch(&self, name: &str, expected: &'static str, found: &Value) -> OperationError {
        OperationError::KeywordType {
            operation: self.operation.to_string(),
            keyword: name.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    fn missing(&self, name: &str) -> OperationError {
        OperationError::MissingKeyword {
            operation: self.operation.to_string(),
            keyword: name.to_string(),
        }
    }

    /// Take an optional integer keyword.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::KeywordType`] if the value is not an
    /// integer.
    pub fn int(&mut self, name: &str) -> Result<Option<i64>, OperationError> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(v)),
            Some(other) => Err(self.mismatch(name, "an integer", &other)),
        }
    }

    /// Take a required integer keyword.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MissingKeyword`] if absent, or
    /// [`OperationError::KeywordType`] if not an integer.
    pub fn required_int(&mut self, name: &str) -> Result<i64, OperationError> {
        self.int(name)?.ok_or_else(|| self.missing(name))
    }

    /// Take an optional boolean keyword.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::KeywordType`] if the value is not a
    /// boolean.
    pub fn boolean(&mut self, name: &str) -> Result<Option<bool>, OperationError> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Bool(v)) => Ok(Some(v)),
            Some(other) => Err(self.mismatch(name, "a boolean", &other)),
        }
    }

    /// Take a required integer-pair keyword.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MissingKeyword`] if absent, or
    /// [`OperationError::KeywordType`] if not a pair.
    pub fn required_pair(&mut self, name: &str) -> Result<(i64, i64), OperationError> {
        match self.take(name) {
            None => Err(self.missing(name)),
            Some(Value::Pair(a, b)) => Ok((a, b)),
            Some(other) => Err(self.mismatch(name, "an integer pair", &other)),
        }
    }

    /// Finish reading; any keyword not taken is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnexpectedKeyword`] naming the first
    /// keyword the operation did not take.
    pub fn finish(self) -> Result<(), OperationError> {
        match self.taken.iter().position(|taken| !taken) {
            None => Ok(()),
            Some(index) => Err(OperationError::UnexpectedKeyword {
                operation: self.operation.to_string(),
                keyword: self.kwargs.0[index].0.clone(),
            }),
        }
    }
}
