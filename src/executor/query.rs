//! Query description: optional filter, comparator and limit

use std::cmp::Ordering;
use std::fmt;

type Filter<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;
type Comparator<'a, T> = Box<dyn Fn(&T, &T) -> Ordering + 'a>;

/// A filter/sort/limit query over a full scan.
///
/// `limit` is applied during the scan, before `sort`: a limited sorted
/// query returns the first `limit` matches in key order, sorted. It is not
/// a top-k over the whole store.
pub struct Query<'a, T> {
    pub(crate) filter: Option<Filter<'a, T>>,
    pub(crate) sort: Option<Comparator<'a, T>>,
    pub(crate) limit: Option<usize>,
}

impl<'a, T> Query<'a, T> {
    /// Matches every record, unsorted, unlimited
    pub fn new() -> Self {
        Self {
            filter: None,
            sort: None,
            limit: None,
        }
    }

    /// Keeps only records for which `f` returns true
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> bool + 'a,
    {
        self.filter = Some(Box::new(f));
        self
    }

    /// Sorts the collected results with `cmp` (stable)
    pub fn sort<F>(mut self, cmp: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'a,
    {
        self.sort = Some(Box::new(cmp));
        self
    }

    /// Stops scanning once `limit` records matched
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the configured limit
    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns true if neither filter, sort nor limit is set
    pub fn is_full_scan(&self) -> bool {
        self.filter.is_none() && self.sort.is_none() && self.limit.is_none()
    }
}

impl<T> Default for Query<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Query<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("filter", &self.filter.is_some())
            .field("sort", &self.sort.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let q: Query<'_, i64> = Query::new();
        assert!(q.is_full_scan());

        let threshold = 3;
        let q = Query::new()
            .filter(|n: &i64| *n > threshold)
            .sort(|a: &i64, b: &i64| b.cmp(a))
            .limit(2);
        assert!(!q.is_full_scan());
        assert_eq!(q.get_limit(), Some(2));
        assert!(q.filter.as_ref().map(|f| f(&4)).unwrap());
        assert_eq!(format!("{:?}", q), "Query { filter: true, sort: true, limit: Some(2) }");
    }
}
