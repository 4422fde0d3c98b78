use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

/// The name an [`Operation`] races under, such as a URL or a task name.
///
/// Labels are cheap to clone; the race hands the winner's label back to the
/// caller together with its value.
///
/// [`Operation`]: crate::operation::Operation
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Arc<str>);

impl Label {
    /// Create a new label.
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Self(Arc::from(label))
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Self(Arc::from(label))
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn conversions_agree() {
        let owned = String::from("https://example.com");
        let label = Label::new(&owned);
        assert_eq!(label, Label::from(owned.as_str()));
        assert_eq!(label, Label::from(owned.clone()));
        assert_eq!(label.as_str(), owned);
        assert_eq!(label.to_string(), owned);
        assert_eq!(format!("{label:?}"), format!("{owned:?}"));
    }

    #[test]
    fn lookup_by_str() {
        let labels: HashSet<Label> = ["a", "b"].into_iter().map(Label::new).collect();
        assert!(labels.contains("a"));
        assert!(!labels.contains("c"));
    }
}
