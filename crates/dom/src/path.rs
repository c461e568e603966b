// ABOUTME: Path steps used to descend into a freshly parsed subtree.
// ABOUTME: A step is a children-collection position or a named lookup by id/name attribute.

use std::fmt;

/// One descent step into a children collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Position among element children.
    Index(usize),
    /// First element child whose `id` or `name` attribute equals the key.
    Name(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Index(i) => write!(f, "{}", i),
            PathStep::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

/// Numeric strings become indices, anything else a named lookup.
impl From<&str> for PathStep {
    fn from(s: &str) -> Self {
        match s.parse::<usize>() {
            Ok(index) => PathStep::Index(index),
            Err(_) => PathStep::Name(s.to_string()),
        }
    }
}

impl From<String> for PathStep {
    fn from(s: String) -> Self {
        PathStep::from(s.as_str())
    }
}

/// Converts a sequence of step-like values into a path.
pub fn path<I, S>(steps: I) -> Vec<PathStep>
where
    I: IntoIterator<Item = S>,
    S: Into<PathStep>,
{
    steps.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_are_indices() {
        assert_eq!(PathStep::from("0"), PathStep::Index(0));
        assert_eq!(PathStep::from("12"), PathStep::Index(12));
        assert_eq!(PathStep::from("nav"), PathStep::Name("nav".to_string()));
        assert_eq!(PathStep::from("-1"), PathStep::Name("-1".to_string()));
    }

    #[test]
    fn test_path_builder() {
        assert_eq!(
            path(["0", "menu"]),
            vec![PathStep::Index(0), PathStep::Name("menu".to_string())]
        );
        assert_eq!(path([1usize, 2]), vec![PathStep::Index(1), PathStep::Index(2)]);
    }

    #[test]
    fn test_display_round_trips_source() {
        assert_eq!(PathStep::Index(3).to_string(), "3");
        assert_eq!(PathStep::Name("x".into()).to_string(), "x");
    }
}
