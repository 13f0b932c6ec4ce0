use thiserror::Error;

/// Failure modes of [`crate::descriptor::parse`].
///
/// Value extraction and injection ([`crate::codec::get_value`] /
/// [`crate::codec::set_value`]) are total functions and never return an
/// error: a malformed or not-yet-populated item degrades to a best-effort
/// raw value rather than aborting the caller's poll loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HidError {
    #[error("report descriptor exceeds {max} bytes")]
    DescriptorTooLarge { max: usize },

    #[error("collection path exceeds depth {max}")]
    PathTooDeep { max: usize },

    #[error("usage stack exceeds {max} entries")]
    UsageStackOverflow { max: usize },

    #[error("descriptor declares more than {max} distinct report IDs")]
    TooManyReports { max: usize },

    #[error("end collection with no open collection")]
    UnbalancedCollection,

    #[error("long item declares {declared} bytes but only {remaining} remain")]
    TruncatedLongItem { declared: usize, remaining: usize },

    #[error("item at offset {offset} declares {declared} payload bytes but only {remaining} remain")]
    TruncatedItem {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
}

pub type Result<T> = std::result::Result<T, HidError>;
