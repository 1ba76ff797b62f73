use std::time::{Duration, Instant};

/// How long [`Eventual::wait`][crate::Eventual::wait] may block the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Do not block at all; only check whether the value is already there.
    Now,
    /// Block for at most this long.
    Interval(Duration),
    /// Block until the value is determined, however long that takes.
    Forever,
}

impl Timeout {
    /// Returns the point in time at which a wait starting at `start` gives up.
    ///
    /// [`Timeout::Forever`] (and intervals too long to be represented) yield [`None`].
    pub(crate) fn deadline_from(self, start: Instant) -> Option<Instant> {
        match self {
            Timeout::Now => Some(start),
            Timeout::Interval(dur) => start.checked_add(dur),
            Timeout::Forever => None,
        }
    }
}

impl From<Duration> for Timeout {
    #[inline]
    fn from(dur: Duration) -> Self {
        Timeout::Interval(dur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlines() {
        let start = Instant::now();
        assert_eq!(Timeout::Now.deadline_from(start), Some(start));
        assert_eq!(
            Timeout::from(Duration::from_millis(5)).deadline_from(start),
            Some(start + Duration::from_millis(5))
        );
        assert_eq!(Timeout::Forever.deadline_from(start), None);
        assert_eq!(Timeout::Interval(Duration::MAX).deadline_from(start), None);
    }
}
