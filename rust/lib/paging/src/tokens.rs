use serde::{Serialize, Serializer};

/// Pages shown on each side of the current page.
const WINDOW: u32 = 2;

/// One entry of a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(u32),
    Ellipsis,
}

impl PageToken {
    /// Whether clicking this token should navigate anywhere.
    pub fn is_selectable(&self, current: u32) -> bool {
        matches!(self, PageToken::Page(p) if *p != current)
    }
}

/// Serialized as the page number, or `"..."` for an ellipsis.
impl Serialize for PageToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageToken::Page(p) => serializer.serialize_u32(*p),
            PageToken::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Page-number tokens for a control showing `current` out of `total` pages.
///
/// Page 1 and the last page are always present; pages within two of
/// `current` fill the middle; a gap on either side collapses to a single
/// ellipsis. The result never holds more than nine tokens. A `current`
/// past the end is clamped to the last page.
pub fn page_tokens(current: u32, total: u32) -> Vec<PageToken> {
    if total <= 1 {
        return vec![PageToken::Page(1)];
    }
    let current = current.clamp(1, total);

    let lower = current.saturating_sub(WINDOW).max(2);
    let upper = current.saturating_add(WINDOW).min(total - 1);

    let mut tokens = Vec::with_capacity((2 * WINDOW + 5) as usize);
    tokens.push(PageToken::Page(1));
    if current.saturating_sub(WINDOW) > 2 {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.extend((lower..=upper).map(PageToken::Page));
    if current.saturating_add(WINDOW) < total - 1 {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.push(PageToken::Page(total));
    tokens
}
