use super::parsing::parse_leading_integer;

/// Homes per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Split `items` into consecutive pages of at most `page_size` elements.
///
/// The final page may be shorter; no items yields no pages. A page size of
/// zero is treated as one.
pub fn paginate<T: Clone>(items: &[T], page_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(page_size.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

/// Raw `page` query parameter read as a base-10 integer.
///
/// `None` when the parameter is absent or has no leading digits; callers fall
/// back to the first page.
pub fn page_from_query(query: &str) -> Option<i64> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| parse_leading_integer(&value))
}

/// 1-based page number to show for a requested page; anything non-positive is page 1.
pub fn resolve_page(requested: Option<i64>) -> usize {
    match requested {
        Some(page) if page >= 1 => usize::try_from(page).unwrap_or(usize::MAX),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_fixed_size_pages() {
        let items: Vec<u32> = (1..=17).collect();
        let pages = paginate(&items, 8);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], (1..=8).collect::<Vec<_>>());
        assert_eq!(pages[1], (9..=16).collect::<Vec<_>>());
        assert_eq!(pages[2], vec![17]);
    }

    #[test]
    fn empty_input_has_no_pages() {
        let pages = paginate::<u32>(&[], DEFAULT_PAGE_SIZE);
        assert!(pages.is_empty());
    }

    #[test]
    fn zero_page_size_is_clamped() {
        assert_eq!(paginate(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn reads_page_parameter() {
        assert_eq!(page_from_query("?page=3"), Some(3));
        assert_eq!(page_from_query("sort=asc&page=12abc"), Some(12));
        assert_eq!(page_from_query("page=two"), None);
        assert_eq!(page_from_query(""), None);
    }

    #[test]
    fn invalid_pages_resolve_to_first() {
        assert_eq!(resolve_page(None), 1);
        assert_eq!(resolve_page(Some(0)), 1);
        assert_eq!(resolve_page(Some(-4)), 1);
        assert_eq!(resolve_page(Some(5)), 5);
    }
}
