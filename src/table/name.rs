//! Hierarchical names.

use std::fmt;

/// A hierarchical name such as `/video/hd/seg=3`.
///
/// Components are compared component-wise, so `/a/b` is a prefix of
/// `/a/b/c` but not of `/a/bc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The root name `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name from its components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a URI such as `/a/b`. Empty components are skipped.
    pub fn from_uri(uri: &str) -> Self {
        Self::from_components(uri.split('/').filter(|c| !c.is_empty()))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the root name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    /// Iterate over components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// The first `n` components (the whole name if `n` exceeds its length).
    pub fn prefix(&self, n: usize) -> Name {
        let n = n.min(self.components.len());
        Self {
            components: self.components[..n].to_vec(),
        }
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }

    /// Append a component.
    pub fn push(&mut self, component: impl Into<String>) {
        self.components.push(component.into());
    }

    /// Return a copy with `component` appended.
    pub fn append(mut self, component: impl Into<String>) -> Self {
        self.push(component);
        self
    }
}

impl From<&str> for Name {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}
