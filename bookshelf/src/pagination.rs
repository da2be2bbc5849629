use crate::{
    endpoints::{DEFAULT_LIMIT, DEFAULT_PAGE},
    model::{BookFilter, BorrowFilter, Paginated}
};

/// Page cursor for a list view. Responses are never rewritten; a view that
/// lands past the last page (e.g. after deletions) calls [`Pager::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: u32,
    pub limit: u32
}

impl Default for Pager {
    fn default() -> Self {
        Pager {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT
        }
    }
}

impl Pager {
    pub fn new(page: u32, limit: u32) -> Self {
        Pager {
            page: page.max(1),
            limit: limit.max(1)
        }
    }

    /// Moves back onto the last page if `response` says we're past it.
    /// Returns whether the page changed.
    pub fn clamp_to<T>(&mut self, response: &Paginated<T>) -> bool {
        let clamped = self.page.clamp(1, response.pages.max(1));
        let changed = clamped != self.page;
        self.page = clamped;
        changed
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next<T>(&self, response: &Paginated<T>) -> bool {
        self.page < response.pages
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn next<T>(&mut self, response: &Paginated<T>) {
        if self.has_next(response) {
            self.page += 1;
        }
    }

    /// "Page 1 of 3 • Total: 25"
    pub fn label<T>(response: &Paginated<T>) -> String {
        format!("Page {} of {} • Total: {}", response.page, response.pages, response.total)
    }

    pub fn book_filter(&self, filter: BookFilter) -> BookFilter {
        BookFilter {
            page: Some(self.page),
            limit: Some(self.limit),
            ..filter
        }
    }

    pub fn borrow_filter(&self, filter: BorrowFilter) -> BorrowFilter {
        BorrowFilter {
            page: Some(self.page),
            limit: Some(self.limit),
            ..filter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, pages: u32, total: u64) -> Paginated<u8> {
        Paginated {
            items: Vec::new(),
            total,
            page,
            pages,
            count: 0
        }
    }

    #[test]
    fn steps_within_bounds() {
        let response = page(1, 3, 25);
        let mut pager = Pager::default();
        assert!(!pager.has_prev());
        assert!(pager.has_next(&response));

        pager.next(&response);
        pager.next(&response);
        pager.next(&response);
        assert_eq!(pager.page, 3);

        pager.prev();
        pager.prev();
        pager.prev();
        assert_eq!(pager.page, 1);
    }

    #[test]
    fn clamps_after_the_last_page_disappears() {
        let mut pager = Pager::new(4, 10);
        assert!(pager.clamp_to(&page(4, 3, 30)));
        assert_eq!(pager.page, 3);
        assert!(!pager.clamp_to(&page(3, 3, 30)));
        assert!(pager.clamp_to(&page(3, 0, 0)));
        assert_eq!(pager.page, 1);
    }

    #[test]
    fn label_and_filters() {
        assert_eq!(Pager::label(&page(1, 3, 25)), "Page 1 of 3 • Total: 25");
        let filter = Pager::new(2, 5).book_filter(BookFilter {
            search: Some("dune".into()),
            ..Default::default()
        });
        assert_eq!(filter.page, Some(2));
        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.search.as_deref(), Some("dune"));
        assert_eq!(Pager::default().borrow_filter(BorrowFilter::default()).limit, Some(10));
    }
}
