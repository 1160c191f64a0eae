//! Bounded buffers backing the chart and log windows

use serde::Serialize;
use std::collections::VecDeque;

/// Fixed-capacity ring buffer, oldest entry dropped first
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    inner: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push newest, evicting oldest if at capacity. Returns evicted entry if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.inner.len() >= self.capacity {
            self.inner.pop_front()
        } else {
            None
        };
        self.inner.push_back(item);
        evicted
    }

    /// Replace contents with `items` given oldest first; only the newest
    /// `capacity` survive.
    pub fn replace<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.inner.clear();
        for item in items {
            self.push(item);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.inner.iter()
    }

    /// Newest to oldest
    pub fn iter_recent(&self) -> impl Iterator<Item = &T> {
        self.inner.iter().rev()
    }

    /// Last N entries (most recent last)
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        self.inner.iter().rev().take(n).rev()
    }

    pub fn latest(&self) -> Option<&T> {
        self.inner.back()
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.iter().cloned().collect()
    }
}

/// Chart window: one label column plus N value columns sharing a capacity.
///
/// Columns always have the same length as the labels.
#[derive(Debug, Clone)]
pub struct SeriesWindow {
    labels: RingBuffer<String>,
    columns: Vec<RingBuffer<f64>>,
}

/// Owned copy of a window, ready for a chart update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl SeriesWindow {
    pub fn new(capacity: usize, columns: usize) -> Self {
        Self {
            labels: RingBuffer::new(capacity),
            columns: (0..columns).map(|_| RingBuffer::new(capacity)).collect(),
        }
    }

    /// Append one point. Missing trailing values are recorded as 0.
    pub fn push(&mut self, label: impl Into<String>, values: &[f64]) {
        self.labels.push(label.into());
        for (idx, column) in self.columns.iter_mut().enumerate() {
            column.push(values.get(idx).copied().unwrap_or(0.0));
        }
    }

    /// Replace every column from `(label, values)` rows given oldest first
    pub fn replace<I, L>(&mut self, rows: I)
    where
        I: IntoIterator<Item = (L, Vec<f64>)>,
        L: Into<String>,
    {
        self.labels.clear();
        for column in &mut self.columns {
            column.clear();
        }
        for (label, values) in rows {
            self.push(label, &values);
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.labels.capacity()
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            labels: self.labels.to_vec(),
            columns: self.columns.iter().map(RingBuffer::to_vec).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.push(1), None);
        buf.push(2);
        buf.push(3);
        assert!(buf.is_full());
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.to_vec(), vec![2, 3, 4]);
        assert_eq!(buf.iter_recent().copied().collect::<Vec<_>>(), vec![4, 3, 2]);
        assert_eq!(buf.latest(), Some(&4));
    }

    #[test]
    fn test_replace_keeps_newest() {
        let mut buf = RingBuffer::new(2);
        buf.replace(vec![1, 2, 3, 4]);
        assert_eq!(buf.to_vec(), vec![3, 4]);
        assert_eq!(buf.last_n(1).copied().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buf = RingBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.latest(), Some(&"b"));
    }

    #[test]
    fn test_series_window_columns_stay_aligned() {
        let mut window = SeriesWindow::new(2, 3);
        window.push("t1", &[1.0, 2.0, 3.0]);
        window.push("t2", &[4.0]);
        window.push("t3", &[7.0, 8.0, 9.0]);

        let snap = window.snapshot();
        assert_eq!(snap.labels, vec!["t2", "t3"]);
        assert_eq!(snap.columns[0], vec![4.0, 7.0]);
        assert_eq!(snap.columns[1], vec![0.0, 8.0]);
        assert_eq!(snap.columns[2], vec![0.0, 9.0]);
    }
}
