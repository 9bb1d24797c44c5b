//! Repository-scoped iteration.
//!
//! `RepoRowIter` walks the dataset one repository at a time. For each one it
//! opens the store, asks the factory for a bound iterator, drains it, closes
//! it and moves on. At most one repository is open at any time.

use std::sync::Arc;

use crate::dataset::{Dataset, Repository};
use crate::error::{GitSqlError, GitSqlResult};
use crate::types::Row;

use super::RowIter;

/// Builds the per-repository iterator of a table.
pub trait RepoIterFactory {
    type Iter: RowIter;

    /// Returns an iterator bound to `repo`. The iterator owns the repository
    /// and releases it when closed or dropped.
    fn new_iterator(&self, repo: Repository) -> GitSqlResult<Self::Iter>;
}

pub struct RepoRowIter<F: RepoIterFactory> {
    dataset: Arc<Dataset>,
    factory: F,
    pos: usize,
    current: Option<F::Iter>,
    done: bool,
}

impl<F: RepoIterFactory> RepoRowIter<F> {
    pub fn new(dataset: Arc<Dataset>, factory: F) -> Self {
        Self {
            dataset,
            factory,
            pos: 0,
            current: None,
            done: false,
        }
    }

    /// Opens the next repository. Returns `Ok(false)` once the dataset is
    /// exhausted.
    fn advance(&mut self) -> GitSqlResult<bool> {
        let Some(source) = self.dataset.get(self.pos) else {
            return Ok(false);
        };
        self.pos += 1;

        let store = source.open()?;
        let repo = Repository::new(source.id(), store);
        tracing::debug!(repository = source.id(), "attaching repository");
        self.current = Some(self.factory.new_iterator(repo)?);
        Ok(true)
    }

    /// Closes the current repository iterator, if any.
    fn release(&mut self) -> GitSqlResult<()> {
        if let Some(mut iter) = self.current.take() {
            tracing::debug!(position = self.pos, "detaching repository");
            iter.close()?;
        }
        Ok(())
    }

    fn fail(&mut self, err: GitSqlError) -> GitSqlError {
        self.done = true;
        if let Err(close_err) = self.release() {
            tracing::warn!(error = %close_err, "failed to release repository after error");
        }
        err
    }
}

impl<F: RepoIterFactory> Iterator for RepoRowIter<F> {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            let Some(iter) = self.current.as_mut() else {
                match self.advance() {
                    Ok(true) => continue,
                    Ok(false) => {
                        self.done = true;
                        return None;
                    }
                    Err(err) => return Some(Err(self.fail(err))),
                }
            };

            match iter.next() {
                Some(Ok(row)) => return Some(Ok(row)),
                Some(Err(err)) => return Some(Err(self.fail(err))),
                None => {
                    if let Err(err) = self.release() {
                        return Some(Err(self.fail(err)));
                    }
                }
            }
        }
    }
}

impl<F: RepoIterFactory> RowIter for RepoRowIter<F> {
    fn close(&mut self) -> GitSqlResult<()> {
        self.done = true;
        self.release()
    }
}

impl<F: RepoIterFactory> Drop for RepoRowIter<F> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
