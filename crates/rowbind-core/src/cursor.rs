//! Forward-only row cursors.

use crate::error::Result;
use crate::value::Value;

/// A forward-only cursor over a tabular result set.
///
/// The cursor starts positioned before the first row; [`advance`] moves to
/// the next row and reports whether one exists. Field metadata (count and
/// names) is stable for the lifetime of the result set and may be read
/// before the first advance.
///
/// [`advance`]: RowCursor::advance
pub trait RowCursor {
    /// Number of fields in the result set.
    fn field_count(&self) -> usize;

    /// Name of the field at `ordinal`, or `None` if out of range.
    fn field_name(&self, ordinal: usize) -> Option<&str>;

    /// Value of the field at `ordinal` in the current row.
    ///
    /// Returns [`Value::Null`] when the ordinal is out of range or the
    /// cursor is not positioned on a row.
    fn value(&self, ordinal: usize) -> Value;

    /// Advance to the next row. Returns `Ok(false)` once exhausted or
    /// closed.
    fn advance(&mut self) -> Result<bool>;

    /// Release the cursor's resources. Safe to call more than once.
    fn close(&mut self);

    /// Check whether the cursor has been closed.
    fn is_closed(&self) -> bool;
}

/// An in-memory [`RowCursor`] over pre-built rows.
///
/// Used as a test fixture and as the backing for adapters that already hold
/// their rows in memory.
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    fields: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Row index plus one; zero means before the first row.
    position: usize,
    closed: bool,
}

impl MemoryCursor {
    /// Create a cursor over `rows` with the given field names.
    pub fn new(
        fields: impl IntoIterator<Item = impl Into<String>>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            rows,
            position: 0,
            closed: false,
        }
    }

    /// Total number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for MemoryCursor {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field_name(&self, ordinal: usize) -> Option<&str> {
        self.fields.get(ordinal).map(String::as_str)
    }

    fn value(&self, ordinal: usize) -> Value {
        if self.closed || self.position == 0 {
            return Value::Null;
        }
        self.rows
            .get(self.position - 1)
            .and_then(|row| row.get(ordinal))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed || self.position >= self.rows.len() {
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rows() -> MemoryCursor {
        MemoryCursor::new(
            ["id", "name"],
            vec![
                vec![Value::Int(1), Value::Text("a".to_string())],
                vec![Value::Int(2), Value::Text("b".to_string())],
            ],
        )
    }

    #[test]
    fn starts_before_first_row() {
        let cursor = two_rows();
        assert_eq!(cursor.value(0), Value::Null);
        assert_eq!(cursor.field_count(), 2);
        assert_eq!(cursor.field_name(1), Some("name"));
    }

    #[test]
    fn advances_through_rows() {
        let mut cursor = two_rows();
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0), Value::Int(1));
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0), Value::Int(2));
        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn short_row_reads_null() {
        let mut cursor = MemoryCursor::new(["a", "b"], vec![vec![Value::Int(1)]]);
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(1), Value::Null);
        assert_eq!(cursor.value(99), Value::Null);
    }

    #[test]
    fn closed_cursor_stays_closed() {
        let mut cursor = two_rows();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(!cursor.advance().unwrap());
        assert_eq!(cursor.value(0), Value::Null);
        cursor.close();
        assert!(cursor.is_closed());
    }
}
