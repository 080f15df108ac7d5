use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::SourceQueryError;
use crate::fragment::FragmentFormat;
use crate::mutator::{GenericMutator, StreamMutator};
use crate::reader::TextEncoding;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CHALLENGES: u8 = 5;

/// Everything a query needs besides the address.
///
/// ```
/// use std::time::Duration;
/// use a2squery::{FragmentFormat, QueryOptions};
///
/// let options = QueryOptions::default()
///     .with_timeout(Duration::from_secs(2))
///     .with_fragment_format(FragmentFormat::Source);
/// assert_eq!(options.timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Longest wait for any single datagram.
    pub timeout: Duration,
    /// Longest wait for the whole request, if bounded.
    pub max_wait: Option<Duration>,
    pub encoding: TextEncoding,
    pub fragment: FragmentFormat,
    pub mutator: Arc<dyn StreamMutator>,
    /// Consecutive challenge responses tolerated before giving up.
    pub max_challenges: u8,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            timeout: DEFAULT_TIMEOUT,
            max_wait: None,
            encoding: TextEncoding::default(),
            fragment: FragmentFormat::default(),
            mutator: Arc::new(GenericMutator),
            max_challenges: DEFAULT_MAX_CHALLENGES,
        }
    }
}

impl QueryOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_fragment_format(mut self, fragment: FragmentFormat) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn with_mutator<M: StreamMutator + 'static>(mut self, mutator: M) -> Self {
        self.mutator = Arc::new(mutator);
        self
    }

    pub fn with_max_challenges(mut self, max_challenges: u8) -> Self {
        self.max_challenges = max_challenges;
        self
    }

    /// When the whole request has to be done by, counted from `start`.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        self.max_wait.map(|max_wait| start + max_wait)
    }

    /// How long the next receive may block.
    ///
    /// Fails with [SourceQueryError::Timeout] once `deadline` has passed.
    pub fn receive_window(&self, deadline: Option<Instant>) -> Result<Duration, SourceQueryError> {
        let window = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                left.min(self.timeout)
            }
            None => self.timeout,
        };
        if window.is_zero() {
            return Err(SourceQueryError::Timeout);
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = QueryOptions::default();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert_eq!(options.max_wait, None);
        assert_eq!(options.fragment, FragmentFormat::GoldSrc);
        assert_eq!(options.encoding, TextEncoding::Utf8);
        assert_eq!(options.mutator.mutate(b"x".to_vec()), b"x");
    }

    #[test]
    fn receive_window_is_bounded_by_deadline() {
        let options = QueryOptions::default().with_timeout(Duration::from_secs(10));
        assert_eq!(options.receive_window(None).unwrap(), Duration::from_secs(10));

        let soon = Instant::now() + Duration::from_secs(1);
        assert!(options.receive_window(Some(soon)).unwrap() <= Duration::from_secs(1));

        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(options.receive_window(Some(past)).unwrap_err().is_timeout());
    }

    #[test]
    fn zero_timeout_times_out() {
        let options = QueryOptions::default().with_timeout(Duration::ZERO);
        assert!(options.receive_window(None).unwrap_err().is_timeout());
    }
}
