use std::fmt;

use serde::Serialize;

/// A named tag attached to a log event, optionally referencing other markers.
///
/// Markers compare by name and references, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Marker {
    name: String,
    references: Vec<Marker>,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Self) -> Self {
        self.references.push(reference);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn references(&self) -> &[Self] {
        &self.references
    }

    /// Whether this marker is `name` or references it, directly or transitively.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name == name || self.references.iter().any(|marker| marker.contains(name))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some((first, rest)) = self.references.split_first() {
            write!(f, " [ {first}")?;
            for reference in rest {
                write!(f, ", {reference}")?;
            }
            f.write_str(" ]")?;
        }
        Ok(())
    }
}
