//! Field paths addressing values inside a form value.

use std::fmt;

use serde_json::Value;
use smol_str::SmolStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Named field of a record.
    Field(SmolStr),
    /// Position inside a sequence.
    Index(usize),
}

/// Location of a value relative to the form root.
///
/// Displayed as `a.b[2].c`; the empty path displays as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted path such as `rules.0.name`. Purely numeric segments
    /// address sequence positions.
    #[must_use]
    pub fn from_dotted(text: &str) -> Self {
        let segments = text
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Field(SmolStr::new(part)),
            })
            .collect();
        Self(segments)
    }

    #[must_use]
    pub fn child(&self, name: impl Into<SmolStr>) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Field(name.into()));
        next
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Index(index));
        next
    }

    /// Append `other` after this path.
    #[must_use]
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut next = self.clone();
        next.0.extend(other.0.iter().cloned());
        next
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment and the path after it.
    #[must_use]
    pub fn split_first(&self) -> Option<(&PathSegment, FieldPath)> {
        let (first, rest) = self.0.split_first()?;
        Some((first, Self(rest.to_vec())))
    }

    /// Last named field in the path, if any.
    #[must_use]
    pub fn leaf_name(&self) -> Option<&SmolStr> {
        self.0.iter().rev().find_map(|segment| match segment {
            PathSegment::Field(name) => Some(name),
            PathSegment::Index(_) => None,
        })
    }

    /// Resolve this path inside `value`.
    #[must_use]
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(value, |current, segment| match segment {
            PathSegment::Field(name) => current.as_object()?.get(name.as_str()),
            PathSegment::Index(index) => current.as_array()?.get(*index),
        })
    }

    /// Mutable variant of [`FieldPath::lookup`]. Missing record fields are
    /// created as `null` so a value can be written into them.
    pub fn lookup_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = value;
        for segment in &self.0 {
            current = match segment {
                PathSegment::Field(name) => current
                    .as_object_mut()?
                    .entry(name.to_string())
                    .or_insert(Value::Null),
                PathSegment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
            };
        }
        Some(current)
    }
}

impl From<&str> for FieldPath {
    fn from(text: &str) -> Self {
        Self::from_dotted(text)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(parts: &[&str]) -> Self {
        Self(
            parts
                .iter()
                .map(|part| PathSegment::Field(SmolStr::new(part)))
                .collect(),
        )
    }
}

impl FromIterator<PathSegment> for FieldPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (idx, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if idx == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
