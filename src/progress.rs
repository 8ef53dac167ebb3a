//! Progress reporting for long batch loops.
//!
//! Progress is emitted as `info` log records so it reaches whatever logger
//! the application installed; when `verbose` is false nothing is reported.

use log::info;

pub struct Progress<I> {
    inner: I,
    prefix: String,
    verbose: bool,
    done: usize,
    total: usize,
}

/// Wrap `iter`, reporting `prefix: done/total (pct%)` after every item.
pub fn print_progress<I>(iter: I, prefix: impl Into<String>, verbose: bool) -> Progress<I::IntoIter>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator,
{
    let inner = iter.into_iter();
    let total = inner.len();
    Progress {
        inner,
        prefix: prefix.into(),
        verbose,
        done: 0,
        total,
    }
}

impl<I: Iterator> Iterator for Progress<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        if item.is_some() {
            self.done += 1;
            if self.verbose {
                let pct = if self.total == 0 {
                    100.0
                } else {
                    100.0 * self.done as f64 / self.total as f64
                };
                info!("{}: {}/{} ({:.0}%)", self.prefix, self.done, self.total, pct);
            }
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
