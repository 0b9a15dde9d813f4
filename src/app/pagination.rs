//! Keyset pagination over `(created_at DESC, id DESC)`.
//!
//! A page boundary is a single reference row. Everything strictly older than
//! it, under the composite key, belongs to later pages. Because `id` breaks
//! timestamp ties the order is total, so rows inserted after a page was served
//! never shift rows between pages the way an `OFFSET` would.

use time::OffsetDateTime;

use crate::domain::comment::Comment;
use crate::domain::post::Post;

/// Rows per page for feeds and sibling comment listings.
pub const PAGE_SIZE: i64 = 10;

/// Reference id meaning "no boundary yet": serve the most recent page.
pub const SENTINEL_ID: i64 = i64::MAX;

pub fn is_sentinel(reference_id: i64) -> bool {
    reference_id == SENTINEL_ID
}

/// Composite sort key. Field order matters: the derived `Ord` compares
/// `created_at` first and falls back to `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyset {
    pub created_at: OffsetDateTime,
    pub id: i64,
}

impl Keyset {
    pub fn new(created_at: OffsetDateTime, id: i64) -> Self {
        Self { created_at, id }
    }

    /// `created_at < ref.created_at OR (created_at = ref.created_at AND id < ref.id)`
    pub fn is_older_than(&self, reference: &Keyset) -> bool {
        self < reference
    }
}

pub trait Keyed {
    fn keyset(&self) -> Keyset;
}

impl Keyed for Post {
    fn keyset(&self) -> Keyset {
        Keyset::new(self.created_at, self.id)
    }
}

impl Keyed for Comment {
    fn keyset(&self) -> Keyset {
        Keyset::new(self.created_at, self.id)
    }
}

/// A resolved page request, handed to the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    Latest,
    Before(Keyset),
}

impl PageCursor {
    pub fn admits(&self, key: &Keyset) -> bool {
        match self {
            Self::Latest => true,
            Self::Before(reference) => key.is_older_than(reference),
        }
    }
}

/// In-memory rendition of the keyset query: filter by the boundary, order
/// newest first, keep at most `limit` rows.
pub fn paginate<T, I>(items: I, cursor: PageCursor, limit: i64) -> Vec<T>
where
    T: Keyed,
    I: IntoIterator<Item = T>,
{
    let limit = usize::try_from(limit).unwrap_or(0);
    let mut page: Vec<T> = items
        .into_iter()
        .filter(|item| cursor.admits(&item.keyset()))
        .collect();
    page.sort_by(|a, b| b.keyset().cmp(&a.keyset()));
    page.truncate(limit);
    page
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use time::Duration;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(Keyset);

    impl Keyed for Row {
        fn keyset(&self) -> Keyset {
            self.0
        }
    }

    fn at(minutes: i64, id: i64) -> Row {
        let base = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
        Row(Keyset::new(base + Duration::minutes(minutes), id))
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|row| row.0.id).collect()
    }

    #[test]
    fn latest_page_is_newest_first() {
        let rows = vec![at(-3, 1), at(-2, 2), at(-1, 3)];
        let page = paginate(rows, PageCursor::Latest, PAGE_SIZE);
        assert_eq!(ids(&page), vec![3, 2, 1]);
    }

    #[test]
    fn equal_timestamps_break_on_id() {
        let rows = vec![at(0, 4), at(0, 9), at(0, 7), at(-1, 12)];
        let page = paginate(rows.clone(), PageCursor::Latest, 2);
        assert_eq!(ids(&page), vec![9, 7]);

        let next = paginate(rows, PageCursor::Before(page[1].0), 2);
        assert_eq!(ids(&next), vec![4, 12]);
    }

    #[test]
    fn boundary_row_is_excluded() {
        let rows = vec![at(0, 1), at(1, 2), at(2, 3)];
        let page = paginate(rows, PageCursor::Before(at(1, 2).0), PAGE_SIZE);
        assert_eq!(ids(&page), vec![1]);
    }

    #[test]
    fn inserts_newer_than_the_boundary_do_not_shift_pages() {
        let mut rows: Vec<Row> = (0..15).map(|i| at(i, i + 1)).collect();
        let first = paginate(rows.clone(), PageCursor::Latest, PAGE_SIZE);
        let boundary = PageCursor::Before(first.last().unwrap().0);
        let before = paginate(rows.clone(), boundary, PAGE_SIZE);

        rows.push(at(100, 99));
        rows.push(at(14, 98));
        let after = paginate(rows, boundary, PAGE_SIZE);

        assert_eq!(before, after);
    }

    #[test]
    fn sentinel_is_max_id() {
        assert!(is_sentinel(i64::MAX));
        assert!(!is_sentinel(0));
    }

    proptest! {
        #[test]
        fn traversal_visits_every_row_once_in_strict_order(
            stamps in prop::collection::vec(0i64..5, 0..60),
            limit in 1i64..12,
        ) {
            let rows: Vec<Row> = stamps
                .iter()
                .enumerate()
                .map(|(idx, minutes)| at(*minutes, idx as i64 + 1))
                .collect();

            let mut cursor = PageCursor::Latest;
            let mut seen = HashSet::new();
            let mut previous: Option<Keyset> = None;
            loop {
                let page = paginate(rows.clone(), cursor, limit);
                if page.is_empty() {
                    break;
                }
                prop_assert!(page.len() as i64 <= limit);
                for row in &page {
                    prop_assert!(seen.insert(row.0.id));
                    if let Some(prev) = previous {
                        prop_assert!(row.0 < prev);
                    }
                    previous = Some(row.0);
                }
                cursor = PageCursor::Before(page.last().unwrap().0);
            }
            prop_assert_eq!(seen.len(), rows.len());
        }
    }
}
