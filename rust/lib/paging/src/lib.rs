//! Paginated, searchable listings.
//!
//! - [`range`]: page number → inclusive row window.
//! - [`tokens`]: compact page-number navigation with ellipses.
//! - [`view`]: the page document every listing endpoint returns.
//! - [`debounce`]: turns a stream of keystrokes into committed searches.
//! - [`controller`]: listing state machine tying the above to a data source.

pub mod controller;
pub mod debounce;
pub mod range;
pub mod tokens;
pub mod view;

pub use controller::{ListQuery, ListingController, Page, PageSource};
pub use debounce::{Debouncer, SEARCH_QUIESCENCE};
pub use range::{compute_range, total_pages, RowRange};
pub use tokens::{page_tokens, PageToken};
pub use view::PageView;
