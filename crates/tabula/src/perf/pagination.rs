use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Position of one page within a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-indexed.
    pub current_page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    /// Page `page` of `total_items` items, `per_page` to a page.
    ///
    /// `per_page` is at least 1. `page` is clamped to the existing pages, so
    /// an out-of-range request lands on the last page (or page 1 of an empty
    /// dataset).
    pub fn new(total_items: usize, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_items.div_ceil(per_page);
        let current_page = page.clamp(1, total_pages.max(1));
        PageInfo {
            current_page,
            per_page,
            total_items,
            total_pages,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }

    /// Item indices on this page.
    pub fn range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.per_page).min(self.total_items);
        let end = (start + self.per_page).min(self.total_items);
        start..end
    }
}

/// One page of items plus its position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub info: PageInfo,
}

/// Slices `data` into page `page` (1-indexed) of `per_page` items.
pub fn paginate<T: Clone>(data: &[T], page: usize, per_page: usize) -> Page<T> {
    let info = PageInfo::new(data.len(), page, per_page);
    Page {
        items: data[info.range()].to_vec(),
        info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page() {
        let data: Vec<u32> = (1..=25).collect();
        let page = paginate(&data, 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.info.total_pages, 3);
        assert!(page.info.has_next);
        assert!(page.info.has_previous);
    }

    #[test]
    fn last_page_is_partial() {
        let data: Vec<u32> = (1..=25).collect();
        let page = paginate(&data, 3, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert!(!page.info.has_next);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        let data: Vec<u32> = (1..=5).collect();
        assert_eq!(paginate(&data, 0, 2).info.current_page, 1);
        assert_eq!(paginate(&data, 99, 2).items, vec![5]);
        assert_eq!(paginate(&data, 1, 0).info.per_page, 1);
    }

    #[test]
    fn empty_dataset() {
        let page = paginate::<u32>(&[], 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.info.total_pages, 0);
        assert_eq!(page.info.current_page, 1);
        assert!(!page.info.has_next);
        assert!(!page.info.has_previous);
    }

    #[test]
    fn info_flattens_into_page() {
        let json = serde_json::to_value(paginate(&[1, 2, 3], 1, 2)).unwrap();
        assert_eq!(json["items"], serde_json::json!([1, 2]));
        assert_eq!(json["total_items"], 3);
        assert_eq!(json["has_next"], true);
    }
}
