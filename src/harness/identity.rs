use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out one fresh name per test case: `<prefix>-1`, `<prefix>-2`, ...
///
/// Owned by the suite; the counter only ever moves through [`next`], which
/// advances it by exactly one whatever becomes of the case.
///
/// [`next`]: NameGenerator::next
#[derive(Debug)]
pub struct NameGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl NameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(first),
        }
    }

    /// Reserve the next name.
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.format(n)
    }

    /// The name the next call to [`NameGenerator::next`] would return.
    pub fn peek(&self) -> String {
        self.format(self.counter.load(Ordering::SeqCst))
    }

    fn format(&self, n: u64) -> String {
        format!("{}-{n}", self.prefix)
    }
}
