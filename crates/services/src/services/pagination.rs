use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub pages: u32,
}

/// Cut one page out of an already filtered and ordered collection.
///
/// `page` is 1-based; missing or zero values fall back to the first page and
/// [`DEFAULT_PAGE_SIZE`]. `limit` is capped at [`MAX_PAGE_SIZE`].
pub fn paginate<T>(items: Vec<T>, page: Option<u32>, limit: Option<u32>) -> (Vec<T>, Pagination) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let total = items.len() as u32;
    let pages = total.div_ceil(limit);
    let skip = ((page - 1) as usize).saturating_mul(limit as usize);

    let slice = items.into_iter().skip(skip).take(limit as usize).collect();
    (
        slice,
        Pagination {
            page,
            limit,
            total,
            pages,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_page_of_25() {
        let (items, pagination) = paginate((1..=25).collect::<Vec<_>>(), Some(2), Some(10));
        assert_eq!(items, (11..=20).collect::<Vec<_>>());
        assert_eq!(
            pagination,
            Pagination {
                page: 2,
                limit: 10,
                total: 25,
                pages: 3
            }
        );
    }

    #[test]
    fn defaults_and_caps() {
        let (items, pagination) = paginate((0..500).collect::<Vec<_>>(), Some(0), Some(1000));
        assert_eq!(items.len(), 100);
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.limit, MAX_PAGE_SIZE);
        assert_eq!(pagination.pages, 5);
    }

    #[test]
    fn empty_collection_has_zero_pages() {
        let (items, pagination) = paginate(Vec::<u8>::new(), None, None);
        assert!(items.is_empty());
        assert_eq!(pagination.total, 0);
        assert_eq!(pagination.pages, 0);
        assert_eq!(pagination.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let (items, pagination) = paginate(vec![1, 2, 3], Some(9), Some(2));
        assert!(items.is_empty());
        assert_eq!(pagination.pages, 2);
    }
}
