/// Most page buttons shown at once, edge buttons excluded.
pub const MAX_PAGE_BUTTONS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page { number: u64, current: bool },
    Ellipsis,
}

/// Buttons for the pagination control: a window of at most
/// [`MAX_PAGE_BUTTONS`] pages centred on `current`, plus first/last page
/// buttons and an ellipsis wherever the window does not reach an edge.
pub fn page_window(current: u64, total_pages: u64) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);
    let half = MAX_PAGE_BUTTONS / 2;

    let mut start = current.saturating_sub(half).max(1);
    let end = (start + MAX_PAGE_BUTTONS - 1).min(total_pages);
    start = end.saturating_sub(MAX_PAGE_BUTTONS - 1).max(1);

    let page = |number| PageItem::Page {
        number,
        current: number == current,
    };

    let mut items = Vec::new();
    if start > 1 {
        items.push(page(1));
        if start > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((start..=end).map(page));
    if end < total_pages {
        if end < total_pages - 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(page(total_pages));
    }
    items
}

/// Page bookkeeping shared by every paginated, searchable view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub total: u64,
}

impl Paging {
    pub fn new(page_size: u64) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_pages: 0,
            total: 0,
        }
    }

    /// Records the totals of a fetched page. Returns the page to fetch
    /// instead when the current one lies past the end; an empty result
    /// falls back to page 1.
    pub fn record(&mut self, total: u64, total_pages: u64) -> Option<u64> {
        self.total = total;
        self.total_pages = total_pages;
        let last = total_pages.max(1);
        if self.page > last {
            self.page = last;
            return Some(last);
        }
        None
    }

    /// Sets the page; returns whether it changed.
    pub fn go_to(&mut self, page: u64) -> bool {
        let upper = self.total_pages.max(1);
        let page = page.clamp(1, upper);
        if page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page + 1)
    }

    pub fn prev(&mut self) -> bool {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn reset(&mut self) -> bool {
        let changed = self.page != 1;
        self.page = 1;
        changed
    }

    pub fn set_page_size(&mut self, size: u64) -> bool {
        let size = size.max(1);
        if size == self.page_size {
            return false;
        }
        self.page_size = size;
        true
    }

    /// After removing a row: step back when it was the last row of a page
    /// beyond the first. Returns whether the page moved.
    pub fn after_delete(&mut self, rows_on_page_before: usize) -> bool {
        if rows_on_page_before == 1 && self.page > 1 {
            self.page -= 1;
            return true;
        }
        false
    }

    /// 1-based position of the first row on the current page.
    pub fn first_row_number(&self) -> u64 {
        (self.page - 1) * self.page_size + 1
    }
}
