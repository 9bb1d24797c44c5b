//! Pull-based row streams.
//!
//! A row stream is an `Iterator<Item = GitSqlResult<Row>>`: `None` is the end
//! of data, `Some(Err(_))` is a failure. On top of that, `RowIter` adds an
//! explicit `close` so a consumer can abandon a stream early and still
//! release whatever the stream holds.

mod driver;

pub use driver::{RepoIterFactory, RepoRowIter};

use tracing::Span;

use crate::error::GitSqlResult;
use crate::expression::Expression;
use crate::types::{Row, Value};

pub trait RowIter: Iterator<Item = GitSqlResult<Row>> {
    /// Releases held resources. Must be safe to call more than once.
    fn close(&mut self) -> GitSqlResult<()> {
        Ok(())
    }
}

pub type BoxRowIter = Box<dyn RowIter + Send>;

impl<I: RowIter + ?Sized> RowIter for Box<I> {
    fn close(&mut self) -> GitSqlResult<()> {
        (**self).close()
    }
}

/// Drains a stream and closes it, returning the first error encountered.
pub fn collect_rows<I: RowIter + ?Sized>(iter: &mut I) -> GitSqlResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = iter.next() {
        match row {
            Ok(row) => rows.push(row),
            Err(err) => {
                let _ = iter.close();
                return Err(err);
            }
        }
    }
    iter.close()?;
    Ok(rows)
}

/// Keeps the rows for which `predicate` evaluates to true.
pub struct FilterIter<I> {
    predicate: Expression,
    child: I,
}

impl<I: RowIter> FilterIter<I> {
    pub fn new(predicate: Expression, child: I) -> Self {
        Self { predicate, child }
    }
}

impl<I: RowIter> Iterator for FilterIter<I> {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.child.next()? {
                Ok(row) => row,
                Err(err) => return Some(Err(err)),
            };
            match self.predicate.eval(&row) {
                Ok(Value::Boolean(true)) => return Some(Ok(row)),
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<I: RowIter> RowIter for FilterIter<I> {
    fn close(&mut self) -> GitSqlResult<()> {
        self.child.close()
    }
}

/// Keeps a tracing span open for as long as the wrapped stream lives.
pub struct SpanIter<I> {
    span: Span,
    child: I,
    rows: u64,
    finished: bool,
}

impl<I: RowIter> SpanIter<I> {
    pub fn new(span: Span, child: I) -> Self {
        Self {
            span,
            child,
            rows: 0,
            finished: false,
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            tracing::debug!(parent: &self.span, rows = self.rows, "row stream finished");
        }
    }
}

impl<I: RowIter> Iterator for SpanIter<I> {
    type Item = GitSqlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = {
            let _enter = self.span.enter();
            self.child.next()
        };
        match &next {
            Some(Ok(_)) => self.rows += 1,
            Some(Err(err)) => {
                tracing::debug!(parent: &self.span, error = %err, "row stream failed");
                self.finish();
            }
            None => self.finish(),
        }
        next
    }
}

impl<I: RowIter> RowIter for SpanIter<I> {
    fn close(&mut self) -> GitSqlResult<()> {
        self.finish();
        let _enter = self.span.enter();
        self.child.close()
    }
}
