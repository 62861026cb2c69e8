//! Core record structures (`FieldValue`, `Employee`, `EmployeeBatch`).
//!
//! Records are dynamically typed: every field holds a [`FieldValue`], so a
//! batch can carry values that a schema would reject (for example a salary
//! written as text). The JSON and XML codecs accept whatever a record holds;
//! only the schema-driven binary codec validates kinds.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name of the container field that wraps the record list.
///
/// Matches the root message shape of the binary schema
/// (`repeated Employee employee = 1;`).
pub const BATCH_FIELD: &str = "employee";

/// A single scalar field value.
///
/// Serialized untagged, so JSON sees plain numbers, strings and booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),
    /// Integral number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text value
    Text(String),
}

impl FieldValue {
    /// Short human-readable name of the value kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if the value is an integer or a float.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Compare two values, treating `Integer(n)` and `Float(n as f64)` as equal.
    ///
    /// Formats without an integer/float distinction (XML text, `double`
    /// schema fields) lose the kind but not the number.
    #[must_use]
    pub fn numerically_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            },
            _ => self == other,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An employee record.
///
/// Field declaration order (`id`, `name`, `salary`) is the serialized order
/// for every text format. Keys other than these three are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Employee {
    /// Employee identifier, canonically an integer
    pub id: FieldValue,
    /// Display name, canonically text
    pub name: FieldValue,
    /// Salary, canonically numeric
    pub salary: FieldValue,
}

impl Employee {
    /// Field names in declaration order.
    pub const FIELD_NAMES: [&'static str; 3] = ["id", "name", "salary"];

    /// Create a record from anything convertible into field values.
    ///
    /// # Examples
    ///
    /// ```
    /// use codecmp::record::{Employee, FieldValue};
    ///
    /// let employee = Employee::new(1, "Ali", 9000);
    /// assert_eq!(employee.name, FieldValue::Text("Ali".to_string()));
    /// ```
    pub fn new(
        id: impl Into<FieldValue>,
        name: impl Into<FieldValue>,
        salary: impl Into<FieldValue>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            salary: salary.into(),
        }
    }

    /// Field name/value pairs in declaration order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &FieldValue); 3] {
        [
            ("id", &self.id),
            ("name", &self.name),
            ("salary", &self.salary),
        ]
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match name {
            "id" => Some(&self.id),
            "name" => Some(&self.name),
            "salary" => Some(&self.salary),
            _ => None,
        }
    }

    /// Compare two records field by field with [`FieldValue::numerically_eq`].
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .all(|((_, a), (_, b))| a.numerically_eq(b))
    }
}

/// An ordered batch of employee records.
///
/// Serialized as `{"employee": [...]}`; a missing container field
/// deserializes to an empty batch, any other key is an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeeBatch {
    /// Records in batch order
    #[serde(rename = "employee", default)]
    pub employees: Vec<Employee>,
}

impl EmployeeBatch {
    /// Create a batch from a list of records.
    #[must_use]
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    /// Number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    /// Returns true if the batch holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Iterate over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Employee> {
        self.employees.iter()
    }

    /// Append a record.
    pub fn push(&mut self, employee: Employee) {
        self.employees.push(employee);
    }

    /// Ids that occur more than once, in first-repeat order.
    ///
    /// Encoding never enforces uniqueness; this is for callers that want to.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<&FieldValue> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for employee in &self.employees {
            // FieldValue holds f64 and so is not Hash; key on the display form
            // plus kind so that Integer(1) and Text("1") stay distinct
            let key = (employee.id.kind(), employee.id.to_string());
            if !seen.insert(key) && !duplicates.contains(&&employee.id) {
                duplicates.push(&employee.id);
            }
        }
        duplicates
    }

    /// Index of the first record that differs from `other`, if any.
    ///
    /// Numbers compare with [`FieldValue::numerically_eq`]. When one batch is
    /// a prefix of the other, the shorter length is returned.
    #[must_use]
    pub fn first_difference(&self, other: &Self) -> Option<usize> {
        let mismatch = self
            .employees
            .iter()
            .zip(&other.employees)
            .position(|(a, b)| !a.matches(b));
        match mismatch {
            Some(index) => Some(index),
            None if self.len() != other.len() => Some(self.len().min(other.len())),
            None => None,
        }
    }
}

impl FromIterator<Employee> for EmployeeBatch {
    fn from_iter<T: IntoIterator<Item = Employee>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EmployeeBatch {
    type Item = &'a Employee;
    type IntoIter = std::slice::Iter<'a, Employee>;

    fn into_iter(self) -> Self::IntoIter {
        self.employees.iter()
    }
}
