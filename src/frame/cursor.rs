//! Repositionable accessors over a [`Content`].
//!
//! A cursor resolves its position once per move and caches the backing array
//! of the major axis, so a linear scan costs one hash lookup (or none, when
//! moving by ordinal) per move and no allocation per cell. Fork/join leaves
//! each drive their own cursor.

use crate::frame::Value;
use crate::frame::array::TypedArray;
use crate::frame::content::{ArrayRef, Content, Coord, read_array, write_array};
use crate::frame::key::IndexKey;
use crate::frame::{FrameError, Result};

fn ordinal_label(ordinal: Option<usize>) -> String {
    match ordinal {
        Some(ordinal) => format!("ordinal {ordinal}"),
        None => "unpositioned".to_string(),
    }
}

/// Cursor over single cells
#[derive(Debug)]
pub struct Cursor<'a, R: IndexKey, C: IndexKey> {
    content: &'a Content<R, C>,
    row: Option<(usize, usize)>,
    col: Option<(usize, usize)>,
    /// Array of the current major-axis position
    array: Option<&'a ArrayRef>,
}

impl<'a, R: IndexKey, C: IndexKey> Cursor<'a, R, C> {
    pub(crate) fn new(content: &'a Content<R, C>) -> Self {
        Cursor {
            content,
            row: None,
            col: None,
            array: None,
        }
    }

    /// Moves to a row; `(ordinal, physical slot)` is resolved in O(1).
    pub fn move_to_row<'k>(&mut self, row: impl Into<Coord<'k, R>>) -> Result<&mut Self> {
        let row = row.into();
        let slot = self.content.row_slot(row)?;
        let ordinal = match row {
            Coord::Ordinal(ordinal) => ordinal,
            Coord::Key(key) => self
                .content
                .row_keys()
                .get_ordinal_for_index(slot)
                .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))?,
        };
        self.row = Some((ordinal, slot));
        if !self.content.is_column_store() {
            self.array = Some(self.content.major_array(slot)?);
        }
        Ok(self)
    }

    pub fn move_to_col<'k>(&mut self, col: impl Into<Coord<'k, C>>) -> Result<&mut Self> {
        let col = col.into();
        let slot = self.content.col_slot(col)?;
        let ordinal = match col {
            Coord::Ordinal(ordinal) => ordinal,
            Coord::Key(key) => self
                .content
                .col_keys()
                .get_ordinal_for_index(slot)
                .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))?,
        };
        self.col = Some((ordinal, slot));
        if self.content.is_column_store() {
            self.array = Some(self.content.major_array(slot)?);
        }
        Ok(self)
    }

    pub fn move_to<'r, 'c>(
        &mut self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<&mut Self> {
        self.move_to_row(row)?;
        self.move_to_col(col)
    }

    pub fn row_ordinal(&self) -> Option<usize> {
        self.row.map(|(ordinal, _)| ordinal)
    }

    pub fn col_ordinal(&self) -> Option<usize> {
        self.col.map(|(ordinal, _)| ordinal)
    }

    pub fn row_key(&self) -> Result<&'a R> {
        let ordinal = self.row_ordinal().ok_or(FrameError::CursorNotPositioned)?;
        self.content.row_keys().key(ordinal)
    }

    pub fn col_key(&self) -> Result<&'a C> {
        let ordinal = self.col_ordinal().ok_or(FrameError::CursorNotPositioned)?;
        self.content.col_keys().key(ordinal)
    }

    fn position(&self) -> Result<(&'a ArrayRef, usize)> {
        match (self.array, self.row, self.col) {
            (Some(array), Some((_, row_slot)), Some((_, col_slot))) => {
                let slot = if self.content.is_column_store() {
                    row_slot
                } else {
                    col_slot
                };
                Ok((array, slot))
            }
            _ => Err(FrameError::CursorNotPositioned),
        }
    }

    fn wrap(&self, source: FrameError) -> FrameError {
        FrameError::Access {
            row: ordinal_label(self.row_ordinal()),
            col: ordinal_label(self.col_ordinal()),
            source: Box::new(source),
        }
    }

    fn read<T>(&self, read: impl FnOnce(&TypedArray, usize) -> Result<T>) -> Result<T> {
        let (array, slot) = self.position()?;
        read(&read_array(array), slot).map_err(|source| self.wrap(source))
    }

    fn write(&self, write: impl FnOnce(&mut TypedArray, usize) -> Result<()>) -> Result<()> {
        let (array, slot) = self.position()?;
        write(&mut write_array(array), slot).map_err(|source| self.wrap(source))
    }

    pub fn get_bool(&self) -> Result<bool> {
        self.read(|a, slot| a.get_bool(slot))
    }

    pub fn get_int(&self) -> Result<i32> {
        self.read(|a, slot| a.get_int(slot))
    }

    pub fn get_long(&self) -> Result<i64> {
        self.read(|a, slot| a.get_long(slot))
    }

    pub fn get_double(&self) -> Result<f64> {
        self.read(|a, slot| a.get_double(slot))
    }

    pub fn get_value(&self) -> Result<Value> {
        self.read(|a, slot| a.get_value(slot))
    }

    pub fn set_bool(&self, value: bool) -> Result<()> {
        self.write(|a, slot| a.set_bool(slot, value))
    }

    pub fn set_int(&self, value: i32) -> Result<()> {
        self.write(|a, slot| a.set_int(slot, value))
    }

    pub fn set_long(&self, value: i64) -> Result<()> {
        self.write(|a, slot| a.set_long(slot, value))
    }

    pub fn set_double(&self, value: f64) -> Result<()> {
        self.write(|a, slot| a.set_double(slot, value))
    }

    pub fn set_value(&self, value: Value) -> Result<()> {
        self.write(|a, slot| a.set_value(slot, value))
    }
}

/// Typed get/set by the coordinate along the cursor's free axis
macro_rules! vector_accessors {
    ($free:ident) => {
        pub fn get_bool<'k>(&self, at: impl Into<Coord<'k, $free>>) -> Result<bool> {
            self.read(at.into(), |a, slot| a.get_bool(slot))
        }

        pub fn get_int<'k>(&self, at: impl Into<Coord<'k, $free>>) -> Result<i32> {
            self.read(at.into(), |a, slot| a.get_int(slot))
        }

        pub fn get_long<'k>(&self, at: impl Into<Coord<'k, $free>>) -> Result<i64> {
            self.read(at.into(), |a, slot| a.get_long(slot))
        }

        pub fn get_double<'k>(&self, at: impl Into<Coord<'k, $free>>) -> Result<f64> {
            self.read(at.into(), |a, slot| a.get_double(slot))
        }

        pub fn get_value<'k>(&self, at: impl Into<Coord<'k, $free>>) -> Result<Value> {
            self.read(at.into(), |a, slot| a.get_value(slot))
        }

        pub fn set_bool<'k>(&self, at: impl Into<Coord<'k, $free>>, value: bool) -> Result<()> {
            self.write(at.into(), |a, slot| a.set_bool(slot, value))
        }

        pub fn set_int<'k>(&self, at: impl Into<Coord<'k, $free>>, value: i32) -> Result<()> {
            self.write(at.into(), |a, slot| a.set_int(slot, value))
        }

        pub fn set_long<'k>(&self, at: impl Into<Coord<'k, $free>>, value: i64) -> Result<()> {
            self.write(at.into(), |a, slot| a.set_long(slot, value))
        }

        pub fn set_double<'k>(&self, at: impl Into<Coord<'k, $free>>, value: f64) -> Result<()> {
            self.write(at.into(), |a, slot| a.set_double(slot, value))
        }

        pub fn set_value<'k>(&self, at: impl Into<Coord<'k, $free>>, value: Value) -> Result<()> {
            self.write(at.into(), |a, slot| a.set_value(slot, value))
        }
    };
}

/// View over one row, addressed by column
#[derive(Debug)]
pub struct RowCursor<'a, R: IndexKey, C: IndexKey> {
    content: &'a Content<R, C>,
    row: Option<(usize, usize)>,
    /// Row array when rows are the major axis
    array: Option<&'a ArrayRef>,
}

impl<'a, R: IndexKey, C: IndexKey> RowCursor<'a, R, C> {
    pub(crate) fn new(content: &'a Content<R, C>) -> Self {
        RowCursor {
            content,
            row: None,
            array: None,
        }
    }

    pub fn move_to<'k>(&mut self, row: impl Into<Coord<'k, R>>) -> Result<&mut Self> {
        let row = row.into();
        let slot = self.content.row_slot(row)?;
        let ordinal = match row {
            Coord::Ordinal(ordinal) => ordinal,
            Coord::Key(key) => self
                .content
                .row_keys()
                .get_ordinal_for_index(slot)
                .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))?,
        };
        self.row = Some((ordinal, slot));
        if !self.content.is_column_store() {
            self.array = Some(self.content.major_array(slot)?);
        }
        Ok(self)
    }

    pub fn ordinal(&self) -> Option<usize> {
        self.row.map(|(ordinal, _)| ordinal)
    }

    pub fn key(&self) -> Result<&'a R> {
        let ordinal = self.ordinal().ok_or(FrameError::CursorNotPositioned)?;
        self.content.row_keys().key(ordinal)
    }

    /// Number of cells in the row
    pub fn size(&self) -> usize {
        self.content.col_count()
    }

    fn cell(&self, col: Coord<'_, C>) -> Result<(&'a ArrayRef, usize)> {
        let (_, row_slot) = self.row.ok_or(FrameError::CursorNotPositioned)?;
        let col_slot = self.content.col_slot(col)?;
        match self.array {
            Some(array) => Ok((array, col_slot)),
            None => Ok((self.content.major_array(col_slot)?, row_slot)),
        }
    }

    fn wrap(&self, col: Coord<'_, C>, source: FrameError) -> FrameError {
        FrameError::Access {
            row: ordinal_label(self.ordinal()),
            col: col.describe(),
            source: Box::new(source),
        }
    }

    fn read<T>(
        &self,
        col: Coord<'_, C>,
        read: impl FnOnce(&TypedArray, usize) -> Result<T>,
    ) -> Result<T> {
        self.cell(col)
            .and_then(|(array, slot)| read(&read_array(array), slot))
            .map_err(|source| self.wrap(col, source))
    }

    fn write(
        &self,
        col: Coord<'_, C>,
        write: impl FnOnce(&mut TypedArray, usize) -> Result<()>,
    ) -> Result<()> {
        self.cell(col)
            .and_then(|(array, slot)| write(&mut write_array(array), slot))
            .map_err(|source| self.wrap(col, source))
    }

    vector_accessors!(C);
}

/// View over one column, addressed by row
#[derive(Debug)]
pub struct ColCursor<'a, R: IndexKey, C: IndexKey> {
    content: &'a Content<R, C>,
    col: Option<(usize, usize)>,
    /// Column array when columns are the major axis
    array: Option<&'a ArrayRef>,
}

impl<'a, R: IndexKey, C: IndexKey> ColCursor<'a, R, C> {
    pub(crate) fn new(content: &'a Content<R, C>) -> Self {
        ColCursor {
            content,
            col: None,
            array: None,
        }
    }

    pub fn move_to<'k>(&mut self, col: impl Into<Coord<'k, C>>) -> Result<&mut Self> {
        let col = col.into();
        let slot = self.content.col_slot(col)?;
        let ordinal = match col {
            Coord::Ordinal(ordinal) => ordinal,
            Coord::Key(key) => self
                .content
                .col_keys()
                .get_ordinal_for_index(slot)
                .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))?,
        };
        self.col = Some((ordinal, slot));
        if self.content.is_column_store() {
            self.array = Some(self.content.major_array(slot)?);
        }
        Ok(self)
    }

    pub fn ordinal(&self) -> Option<usize> {
        self.col.map(|(ordinal, _)| ordinal)
    }

    pub fn key(&self) -> Result<&'a C> {
        let ordinal = self.ordinal().ok_or(FrameError::CursorNotPositioned)?;
        self.content.col_keys().key(ordinal)
    }

    /// Number of cells in the column
    pub fn size(&self) -> usize {
        self.content.row_count()
    }

    fn cell(&self, row: Coord<'_, R>) -> Result<(&'a ArrayRef, usize)> {
        let (_, col_slot) = self.col.ok_or(FrameError::CursorNotPositioned)?;
        let row_slot = self.content.row_slot(row)?;
        match self.array {
            Some(array) => Ok((array, row_slot)),
            None => Ok((self.content.major_array(row_slot)?, col_slot)),
        }
    }

    fn wrap(&self, row: Coord<'_, R>, source: FrameError) -> FrameError {
        FrameError::Access {
            row: row.describe(),
            col: ordinal_label(self.ordinal()),
            source: Box::new(source),
        }
    }

    fn read<T>(
        &self,
        row: Coord<'_, R>,
        read: impl FnOnce(&TypedArray, usize) -> Result<T>,
    ) -> Result<T> {
        self.cell(row)
            .and_then(|(array, slot)| read(&read_array(array), slot))
            .map_err(|source| self.wrap(row, source))
    }

    fn write(
        &self,
        row: Coord<'_, R>,
        write: impl FnOnce(&mut TypedArray, usize) -> Result<()>,
    ) -> Result<()> {
        self.cell(row)
            .and_then(|(array, slot)| write(&mut write_array(array), slot))
            .map_err(|source| self.wrap(row, source))
    }

    vector_accessors!(R);

    /// Sum of the column's numeric cells in row ordinal order, skipping NaN
    pub fn sum(&self) -> Result<f64> {
        let mut total = 0.0;
        for row in 0..self.size() {
            let value = self.get_double(row)?;
            if !value.is_nan() {
                total += value;
            }
        }
        Ok(total)
    }
}
