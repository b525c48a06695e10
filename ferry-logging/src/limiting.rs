use std::fmt::{self, Debug};

/// Truncates the debug output of a value, used when logging statements
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaxLogLength<'a, T: Debug> {
    limit: Option<usize>,
    val: &'a T,
}

impl<'a, T: Debug> MaxLogLength<'a, T> {
    pub fn new(limit: Option<usize>, val: &'a T) -> Self {
        Self { limit, val }
    }
}

impl<'a, T: Debug> Debug for MaxLogLength<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt = format!("{:?}", self.val);

        match self.limit {
            Some(limit) if fmt.len() > limit => {
                let end = (0..=limit).rev().find(|i| fmt.is_char_boundary(*i)).unwrap_or(0);
                write!(f, "{}...", &fmt[..end])
            }
            _ => write!(f, "{}", fmt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_log_length_within_bounds() {
        let val = "SELECT * FROM [Contacts]";
        let fmt = format!("{:?}", MaxLogLength::new(Some(50), &val));

        assert_eq!(fmt, "\"SELECT * FROM [Contacts]\"");
    }

    #[test]
    fn test_max_log_length_no_limit() {
        let val = vec![1, 2, 3, 4, 5];
        let fmt = format!("{:?}", MaxLogLength::new(None, &val));

        assert_eq!(fmt, "[1, 2, 3, 4, 5]");
    }

    #[test]
    fn test_max_log_length_truncated() {
        let val = vec![1, 2, 3, 4, 5];
        let fmt = format!("{:?}", MaxLogLength::new(Some(5), &val));

        assert_eq!(fmt, "[1, 2...");
    }

    #[test]
    fn test_max_log_length_truncated_on_char_boundary() {
        let val = "éé";
        let fmt = format!("{:?}", MaxLogLength::new(Some(2), &val));

        assert_eq!(fmt, "\"...");
    }
}
