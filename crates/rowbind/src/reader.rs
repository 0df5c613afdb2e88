//! Lazy single-pass entity stream over a row cursor.

use crate::mapper::Mapper;
use rowbind_core::convert::ConverterSet;
use rowbind_core::cursor::RowCursor;
use rowbind_core::error::Result;
use rowbind_core::record::{FieldIndex, Record};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Created,
    Iterating,
    Closed,
}

/// A forward-only, single-pass stream of mapped entities.
///
/// The reader owns its cursor and guarantees it is closed on exhaustion, on
/// the first mapping or cursor error, and on drop. A second enumeration
/// attempt yields nothing because the cursor is already closed.
pub struct EntityReader<C: RowCursor, T> {
    cursor: C,
    mapper: Arc<Mapper<T>>,
    converters: Arc<ConverterSet>,
    index: Option<FieldIndex>,
    state: ReaderState,
}

impl<C: RowCursor, T> EntityReader<C, T> {
    pub fn new(cursor: C, mapper: Arc<Mapper<T>>, converters: Arc<ConverterSet>) -> Self {
        Self {
            cursor,
            mapper,
            converters,
            index: None,
            state: ReaderState::Created,
        }
    }

    /// Whether the underlying cursor has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == ReaderState::Closed || self.cursor.is_closed()
    }

    /// Close the underlying cursor. Idempotent.
    pub fn close(&mut self) {
        if self.state != ReaderState::Closed {
            tracing::trace!("entity reader closed");
        }
        self.state = ReaderState::Closed;
        self.cursor.close();
    }

    fn pull(&mut self) -> Option<Result<T>> {
        if self.state == ReaderState::Closed {
            return None;
        }
        match self.cursor.advance() {
            Ok(true) => {
                self.state = ReaderState::Iterating;
                // Field metadata is stable for the result set, so the index
                // is built once on the first row.
                let index = self
                    .index
                    .get_or_insert_with(|| FieldIndex::from_cursor(&self.cursor));
                let record = Record::new(&self.cursor, index);
                match self.mapper.create_instance(&record, &self.converters) {
                    Ok(entity) => Some(Ok(entity)),
                    Err(err) => {
                        self.close();
                        Some(Err(err))
                    }
                }
            }
            Ok(false) => {
                self.close();
                None
            }
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}

impl<C: RowCursor, T> Iterator for EntityReader<C, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull()
    }
}

impl<C: RowCursor, T> Drop for EntityReader<C, T> {
    fn drop(&mut self) {
        self.close();
    }
}
