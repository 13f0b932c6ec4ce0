use std::time::{Duration, Instant};

/// A driver-owned cache of the most recently fetched raw report bytes,
/// indexed by report ID, with a staleness bound enforced per read.
///
/// A report is considered absent until first fetched. `set_cached`
/// invalidates every report's timestamp, not just the one written,
/// because UPS firmware frequently packs multiple feature values into one
/// physical report and a write to one field can leave sibling fields in
/// the cache stale without the driver knowing.
pub struct ReportBuffer {
    reports: [Option<(Vec<u8>, Instant)>; 256],
}

impl Default for ReportBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuffer {
    pub fn new() -> Self {
        ReportBuffer {
            reports: std::array::from_fn(|_| None),
        }
    }

    /// Return the cached bytes for `id` if fresher than `max_age`,
    /// otherwise invoke `fetch` to refill the cache and return its result.
    pub fn get_cached<E>(
        &mut self,
        id: u8,
        max_age: Duration,
        fetch: impl FnOnce() -> Result<Vec<u8>, E>,
    ) -> Result<&[u8], E> {
        let idx = id as usize;
        let is_fresh = matches!(&self.reports[idx], Some((_, ts)) if ts.elapsed() <= max_age);
        if !is_fresh {
            let bytes = fetch()?;
            self.reports[idx] = Some((bytes, Instant::now()));
        }
        Ok(self.reports[idx].as_ref().unwrap().0.as_slice())
    }

    /// Record a freshly written report and invalidate every cached report,
    /// including `id` itself, forcing the next read of any report to
    /// refetch.
    pub fn set_cached(&mut self, id: u8, bytes: Vec<u8>) {
        self.reports[id as usize] = Some((bytes, Instant::now()));
        for (idx, slot) in self.reports.iter_mut().enumerate() {
            if idx != id as usize {
                if let Some((_, ts)) = slot {
                    *ts = Instant::now() - Duration::from_secs(3600 * 24 * 365);
                }
            }
        }
    }

    pub fn peek(&self, id: u8) -> Option<&[u8]> {
        self.reports[id as usize].as_ref().map(|(b, _)| b.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_on_first_access_and_caches() {
        let mut buf = ReportBuffer::new();
        let mut calls = 0;
        for _ in 0..3 {
            buf.get_cached::<()>(1, Duration::from_secs(60), || {
                calls += 1;
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn refetches_past_max_age() {
        let mut buf = ReportBuffer::new();
        buf.get_cached::<()>(1, Duration::from_millis(0), || Ok(vec![1]))
            .unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let mut calls = 0;
        buf.get_cached::<()>(1, Duration::from_millis(0), || {
            calls += 1;
            Ok(vec![2])
        })
        .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn write_invalidates_other_reports() {
        let mut buf = ReportBuffer::new();
        buf.get_cached::<()>(1, Duration::from_secs(60), || Ok(vec![9]))
            .unwrap();
        buf.set_cached(2, vec![5]);
        let mut calls = 0;
        buf.get_cached::<()>(1, Duration::from_secs(60), || {
            calls += 1;
            Ok(vec![9])
        })
        .unwrap();
        assert_eq!(calls, 1);
    }
}
