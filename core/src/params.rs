//! Query parameter bags and pagination.
//!
//! # Design
//! `Parameters` is an ordered list of unique keys. Insertion order drives the
//! order of query items, so two requests built from the same sources always
//! produce the same query string. Merging is "later wins": a key that already
//! exists keeps its position but takes the newer value.

/// Anything that can be flattened into query parameters.
///
/// Implemented for `Parameters` itself, `Page`, and plain key/value slices so
/// callers can pass filters without building a bag by hand.
pub trait IntoParameters {
    fn to_parameters(&self) -> Parameters;
}

/// An ordered mapping from query key to value with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style variant of [`Parameters::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `addition` on top of `self`. A `None` addition is a no-op.
    #[must_use]
    pub fn combine<P: IntoParameters + ?Sized>(mut self, addition: Option<&P>) -> Self {
        if let Some(addition) = addition {
            for (key, value) in addition.to_parameters().entries {
                self.insert(key, value);
            }
        }
        self
    }
}

impl IntoParameters for Parameters {
    fn to_parameters(&self) -> Parameters {
        self.clone()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> IntoParameters for [(K, V)] {
    fn to_parameters(&self) -> Parameters {
        self.iter().fold(Parameters::new(), |bag, (k, v)| {
            bag.with(k.as_ref(), v.as_ref())
        })
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> IntoParameters for [(K, V); N] {
    fn to_parameters(&self) -> Parameters {
        self.as_slice().to_parameters()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Parameters::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

/// A pagination cursor: 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// The first page with the default page size.
    pub fn first() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            ..self
        }
    }
}

impl IntoParameters for Page {
    fn to_parameters(&self) -> Parameters {
        Parameters::new()
            .with("page", self.page.to_string())
            .with("per_page", self.per_page.to_string())
    }
}
