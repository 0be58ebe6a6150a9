/// Pagination state definitions
///
/// Search pages are walked strictly in order; this module defines the states
/// the walk goes through and which transitions between them are legal.
use std::fmt;

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExhaustReason {
    /// A page came back with zero listings
    EndOfResults,
    /// The extractor reported no further pages
    NoMorePages,
    /// A page only repeated listings already seen
    NoNewListings,
    /// The advertised result count has been enumerated
    TotalReached,
    /// The configured page limit was reached
    PageLimit,
    /// The configured item limit was reached
    ItemLimit,
    /// The run was cancelled
    Cancelled,
    /// A page failed after all retries
    Failed,
}

impl ExhaustReason {
    /// Returns true if enumeration ended without error
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfResults => "end_of_results",
            Self::NoMorePages => "no_more_pages",
            Self::NoNewListings => "no_new_listings",
            Self::TotalReached => "total_reached",
            Self::PageLimit => "page_limit",
            Self::ItemLimit => "item_limit",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents where the paginator is in its walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    /// Page `n` is next to be requested
    AwaitingPage(u32),

    /// Page `n` was fetched and awaits extraction
    PageFetched(u32),

    /// Page was extracted
    Extracted {
        page: u32,
        found: usize,
        has_more: bool,
    },

    /// No further pages will be requested
    Exhausted(ExhaustReason),
}

impl PaginationState {
    /// Initial state; pagination always starts at page 1
    pub fn start() -> Self {
        Self::AwaitingPage(1)
    }

    /// Returns true once pagination has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Page number the state refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::AwaitingPage(n) | Self::PageFetched(n) => Some(*n),
            Self::Extracted { page, .. } => Some(*page),
            Self::Exhausted(_) => None,
        }
    }

    /// Checks whether moving to `next` is legal
    ///
    /// Legal moves:
    /// - `AwaitingPage(n)` → `PageFetched(n)`
    /// - `PageFetched(n)` → `Extracted { page: n, .. }`
    /// - `Extracted { page: n, .. }` → `AwaitingPage(n + 1)`
    /// - any non-terminal state → `Exhausted(_)`
    /// - `AwaitingPage(n)` or `PageFetched(n)` → `AwaitingPage(n + 1)` (page
    ///   skipped after a fetch or extraction failure)
    pub fn can_transition_to(&self, next: &PaginationState) -> bool {
        match (self, next) {
            (Self::Exhausted(_), _) => false,
            (_, Self::Exhausted(_)) => true,
            (Self::AwaitingPage(n), Self::PageFetched(m)) => n == m,
            (Self::AwaitingPage(n), Self::AwaitingPage(m))
            | (Self::PageFetched(n), Self::AwaitingPage(m)) => m.checked_sub(*n) == Some(1),
            (Self::PageFetched(n), Self::Extracted { page, .. }) => n == page,
            (Self::Extracted { page, .. }, Self::AwaitingPage(m)) => {
                m.checked_sub(*page) == Some(1)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingPage(n) => write!(f, "awaiting_page({})", n),
            Self::PageFetched(n) => write!(f, "page_fetched({})", n),
            Self::Extracted {
                page,
                found,
                has_more,
            } => write!(
                f,
                "extracted(page={}, found={}, has_more={})",
                page, found, has_more
            ),
            Self::Exhausted(reason) => write!(f, "exhausted({})", reason),
        }
    }
}
