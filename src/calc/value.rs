use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Runtime value of a set-theoretic expression.
///
/// `Set` payloads are kept sorted under [`Ord`] and free of duplicates; build
/// them with [`Value::set`] or the set-algebra helpers, never by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Integer(i64),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
}

impl Value {
    /// Canonical set from arbitrary elements.
    pub fn set(mut elements: Vec<Value>) -> Value {
        elements.sort();
        elements.dedup();
        Value::Set(elements)
    }

    pub fn empty_set() -> Value {
        Value::Set(Vec::new())
    }

    pub fn singleton(element: Value) -> Value {
        Value::Set(vec![element])
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<Vec<Value>> {
        match self {
            Value::Set(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Number of elements of a set, components of a tuple, or 1 for an integer.
    pub fn len(&self) -> usize {
        match self {
            Value::Integer(_) => 1,
            Value::Tuple(items) | Value::Set(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Set(items) if items.is_empty())
    }

    /// Tuple component by 1-based index.
    pub fn component(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Tuple(items) => index.checked_sub(1).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Pick tuple components; a single index yields the component itself.
    pub fn project(&self, indices: &[usize]) -> Option<Value> {
        if let [single] = indices {
            return self.component(*single).cloned();
        }
        let picked = indices.iter().map(|&i| self.component(i).cloned()).collect::<Option<Vec<_>>>()?;
        Some(Value::Tuple(picked))
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Tuple(_) => 1,
            Value::Set(_) => 2,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Set(a), Value::Set(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                list(f, items)?;
                write!(f, ")")
            }
            Value::Set(items) if items.is_empty() => write!(f, "∅"),
            Value::Set(items) => {
                write!(f, "{{")?;
                list(f, items)?;
                write!(f, "}}")
            }
        }
    }
}

// ---- sorted-slice set algebra ----

/// Merge-based union of two canonical sets.
pub fn union(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                result.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result
}

pub fn intersection(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                result.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    result
}

pub fn difference(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut result = Vec::with_capacity(a.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result
}

pub fn symmetric_difference(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result
}

pub fn is_subset(a: &[Value], b: &[Value]) -> bool {
    if a.len() > b.len() {
        return false;
    }
    let mut j = 0;
    for item in a {
        while j < b.len() && b[j] < *item {
            j += 1;
        }
        if j >= b.len() || b[j] != *item {
            return false;
        }
        j += 1;
    }
    true
}

pub fn contains(set: &[Value], element: &Value) -> bool {
    set.binary_search(element).is_ok()
}

/// Mixed-radix counter over per-position index ranges.
///
/// Yields every combination of indices `[i0, i1, ...]` with `ik < radices[k]`,
/// the last position advancing fastest.
#[derive(Debug, Clone)]
pub struct Odometer {
    radices: Vec<usize>,
    digits: Vec<usize>,
    done: bool,
}

impl Odometer {
    pub fn new(radices: Vec<usize>) -> Self {
        let done = radices.contains(&0);
        let digits = vec![0; radices.len()];
        Self { radices, digits, done }
    }

    /// Current combination, or `None` once exhausted.
    pub fn current(&self) -> Option<&[usize]> {
        if self.done { None } else { Some(&self.digits) }
    }

    pub fn advance(&mut self) {
        for k in (0..self.digits.len()).rev() {
            self.digits[k] += 1;
            if self.digits[k] < self.radices[k] {
                return;
            }
            self.digits[k] = 0;
        }
        self.done = true;
    }
}
