//! Bound parameter values and their resolution onto placeholder slots.

use cipherlite_core::{DriverError, DriverResult, Value};

use super::raw::RawStatement;

/// One supplied value, optionally tagged with a placeholder name.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    pub name: Option<String>,
    pub value: Value,
}

/// Ordered parameter values for one execution.
///
/// Names may be given with or without the placeholder prefix: `named("id", ..)`
/// and `named(":id", ..)` both bind `:id`. The same name may appear more than
/// once; only its first value is bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundValues {
    entries: Vec<BoundValue>,
}

impl BoundValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.push(value);
        self
    }

    /// Append a value for the placeholder `name`.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_named(name, value);
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.entries.push(BoundValue {
            name: None,
            value: value.into(),
        });
    }

    pub fn push_named(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push(BoundValue {
            name: Some(name.into()),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundValue> {
        self.entries.iter()
    }
}

impl From<Vec<Value>> for BoundValues {
    fn from(values: Vec<Value>) -> Self {
        values.into_iter().collect()
    }
}

impl FromIterator<Value> for BoundValues {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|value| BoundValue { name: None, value })
                .collect(),
        }
    }
}

/// Resolve `values` and bind them to every slot of `stmt`.
///
/// Nothing is bound when resolution fails.
pub(crate) fn bind_all(stmt: &RawStatement, values: &BoundValues) -> DriverResult<()> {
    let resolved = resolve(&stmt.parameter_names(), values)?;
    for (offset, value) in resolved.into_iter().enumerate() {
        stmt.bind(offset + 1, value)?;
    }
    Ok(())
}

/// Pick the value for each placeholder slot.
///
/// Values are taken in order when their count equals the slot count and
/// every named value sits at a slot of that name. Otherwise values are
/// grouped by name (unnamed values each form their own group); there must be
/// exactly one group per slot. Named slots take their group, the remaining
/// slots take the unnamed values in order.
pub(crate) fn resolve<'v>(
    slots: &[Option<String>],
    values: &'v BoundValues,
) -> DriverResult<Vec<&'v Value>> {
    let expected = slots.len();
    let supplied = values.len();
    let mismatch = || DriverError::ParameterMismatch { expected, supplied };

    let positional = supplied == expected
        && values.entries.iter().zip(slots).all(|(entry, slot)| match (&entry.name, slot) {
            (None, _) => true,
            (Some(name), Some(slot)) => names_match(name, slot),
            (Some(_), None) => false,
        });
    if positional {
        return Ok(values.entries.iter().map(|entry| &entry.value).collect());
    }

    let mut groups: Vec<(&str, &Value)> = Vec::new();
    let mut unnamed: Vec<&Value> = Vec::new();
    for entry in &values.entries {
        match &entry.name {
            Some(name) if groups.iter().any(|(seen, _)| *seen == name.as_str()) => {}
            Some(name) => groups.push((name.as_str(), &entry.value)),
            None => unnamed.push(&entry.value),
        }
    }
    if groups.len() + unnamed.len() != expected {
        return Err(mismatch());
    }

    let mut used = vec![false; groups.len()];
    let mut unnamed = unnamed.into_iter();
    let mut resolved = Vec::with_capacity(expected);
    for slot in slots {
        let group = slot.as_deref().and_then(|slot| {
            groups
                .iter()
                .position(|(name, _)| names_match(name, slot))
        });
        match group {
            Some(index) if !used[index] => {
                used[index] = true;
                resolved.push(groups[index].1);
            }
            _ => resolved.push(unnamed.next().ok_or_else(mismatch)?),
        }
    }
    if used.contains(&false) {
        return Err(mismatch());
    }
    Ok(resolved)
}

/// `given` names `slot` exactly or without the slot's prefix character.
fn names_match(given: &str, slot: &str) -> bool {
    given == slot
        || slot
            .strip_prefix([':', '@', '$', '?'])
            .is_some_and(|bare| bare == given)
}
