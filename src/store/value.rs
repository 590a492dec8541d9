//! Value types held by the memory store

use std::collections::{HashSet, VecDeque};

/// The kinds of value a key can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar string value
    Str(String),

    /// Ordered list, pushed and popped at the tail
    List(VecDeque<String>),

    /// Set of unique members (unordered)
    Set(HashSet<String>),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create an empty list
    pub fn empty_list() -> Self {
        Value::List(VecDeque::new())
    }

    /// Create an empty set
    pub fn empty_set() -> Self {
        Value::Set(HashSet::new())
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list reference
    pub fn as_list(&self) -> Option<&VecDeque<String>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get as mutable list
    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<String>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get as set reference
    pub fn as_set(&self) -> Option<&HashSet<String>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Try to get as mutable set
    pub fn as_set_mut(&mut self) -> Option<&mut HashSet<String>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Collections that lost their last element are removed from the keyspace
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(list) => list.is_empty(),
            Value::Set(set) => set.is_empty(),
        }
    }
}
