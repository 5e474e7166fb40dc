//! Whole-table binary layout.
//!
//! ```text
//! header : b"LFRM" | version u8 | rows u32 | cols u32
//!          | row key tag u8 | col key tag u8 | column store u8
//! column : row keys..., then per column [col key, element tag, values...]
//! row    : col keys..., then per row    [row key, element tag, values...]
//! ```
//!
//! Keys and values are written in ordinal order, so filters and sorts are
//! baked in and reading the table back yields fresh, unfiltered indexes.
//! Integers and floats are little-endian; strings are a `u32` byte length
//! followed by UTF-8.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::frame::array::{ArrayType, TypedArray};
use crate::frame::content::{ArrayRef, Content, read_array};
use crate::frame::index::Index;
use crate::frame::index_factory::{DynIndex, IndexFactory};
use crate::frame::key::{IndexKey, KeyType};
use crate::frame::{FrameError, Result, Value};

const MAGIC: &[u8; 4] = b"LFRM";
const VERSION: u8 = 1;

fn format_error(message: impl Into<String>) -> FrameError {
    FrameError::Format(message.into())
}

fn count(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| format_error(format!("{n} entries exceed the u32 count field")))
}

fn write_u32<W: Write>(out: &mut W, v: u32) -> Result<()> {
    out.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_str<W: Write>(out: &mut W, s: &str) -> Result<()> {
    write_u32(out, count(s.len())?)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn write_value<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.write_all(&[0])?,
        Value::Bool(v) => out.write_all(&[1, u8::from(*v)])?,
        Value::Int(v) => {
            out.write_all(&[2])?;
            out.write_all(&v.to_le_bytes())?;
        }
        Value::Long(v) => {
            out.write_all(&[3])?;
            out.write_all(&v.to_le_bytes())?;
        }
        Value::Double(v) => {
            out.write_all(&[4])?;
            out.write_all(&v.to_le_bytes())?;
        }
        Value::Str(v) => {
            out.write_all(&[5])?;
            write_str(out, v)?;
        }
        Value::Date(v) => {
            out.write_all(&[6])?;
            out.write_all(&v.to_julian_day().to_le_bytes())?;
        }
        Value::DateTime(v) => {
            out.write_all(&[7])?;
            out.write_all(&v.assume_utc().unix_timestamp_nanos().to_le_bytes())?;
        }
    }
    Ok(())
}

/// Writes a key without a tag; the key type is fixed by the header.
fn write_key<K: IndexKey, W: Write>(out: &mut W, key: &K) -> Result<()> {
    match (K::KEY_TYPE, key.to_value()) {
        (KeyType::Int, Value::Int(v)) => out.write_all(&v.to_le_bytes())?,
        (KeyType::Long, Value::Long(v)) => out.write_all(&v.to_le_bytes())?,
        (KeyType::Double, Value::Double(v)) => out.write_all(&v.to_le_bytes())?,
        (KeyType::Str, Value::Str(v)) => write_str(out, &v)?,
        (KeyType::Date, Value::Date(v)) => out.write_all(&v.to_julian_day().to_le_bytes())?,
        (KeyType::DateTime, Value::DateTime(v)) => {
            out.write_all(&v.assume_utc().unix_timestamp_nanos().to_le_bytes())?
        }
        (KeyType::Object, value) => write_value(out, &value)?,
        (key_type, value) => {
            return Err(format_error(format!(
                "{} key encoded as {}",
                key_type.name(),
                value.type_name()
            )));
        }
    }
    Ok(())
}

fn write_keys<K: IndexKey, W: Write>(out: &mut W, index: &Index<K>) -> Result<()> {
    for key in index.keys() {
        write_key(out, key)?;
    }
    Ok(())
}

/// Writes the element tag, then the values at `slots` in order
fn write_values<W: Write>(out: &mut W, array: &TypedArray, slots: &[usize]) -> Result<()> {
    let len = array.len();
    if let Some(&slot) = slots.iter().find(|&&slot| slot >= len) {
        return Err(FrameError::OutOfBounds { slot, len });
    }
    out.write_all(&[array.array_type().tag()])?;
    match array {
        TypedArray::Boolean(values) => {
            for &slot in slots {
                out.write_all(&[u8::from(values[slot])])?;
            }
        }
        TypedArray::Int(values) => {
            for &slot in slots {
                out.write_all(&values[slot].to_le_bytes())?;
            }
        }
        TypedArray::Long(values) => {
            for &slot in slots {
                out.write_all(&values[slot].to_le_bytes())?;
            }
        }
        TypedArray::Double(values) => {
            for &slot in slots {
                out.write_all(&values[slot].to_le_bytes())?;
            }
        }
        TypedArray::Str(values) => {
            for &slot in slots {
                match &values[slot] {
                    Some(s) => {
                        out.write_all(&[1])?;
                        write_str(out, s)?;
                    }
                    None => out.write_all(&[0])?,
                }
            }
        }
        TypedArray::Object(values) => {
            for &slot in slots {
                write_value(out, &values[slot])?;
            }
        }
    }
    Ok(())
}

/// Minor keys, then one `[major key, values]` record per major ordinal
fn write_body<'a, M, N, W, F>(out: &mut W, major: &Index<M>, minor: &Index<N>, array_for: F) -> Result<()>
where
    M: IndexKey,
    N: IndexKey,
    W: Write,
    F: Fn(usize) -> Result<&'a ArrayRef>,
{
    write_keys(out, minor)?;
    let minor_slots = minor.physical_slots();
    for (key, slot) in major.keys().zip(major.physical_slots()) {
        write_key(out, key)?;
        let array = read_array(array_for(slot)?);
        write_values(out, &array, &minor_slots)?;
    }
    Ok(())
}

/// Serializes `content` in ordinal order.
pub fn write_content<R: IndexKey, C: IndexKey, W: Write>(
    content: &Content<R, C>,
    out: &mut W,
) -> Result<()> {
    out.write_all(MAGIC)?;
    out.write_all(&[VERSION])?;
    write_u32(out, count(content.row_count())?)?;
    write_u32(out, count(content.col_count())?)?;
    out.write_all(&[
        R::KEY_TYPE.tag(),
        C::KEY_TYPE.tag(),
        u8::from(content.is_column_store()),
    ])?;
    if content.is_column_store() {
        write_body(out, content.col_keys(), content.row_keys(), |slot| {
            content.major_array(slot)
        })
    } else {
        write_body(out, content.row_keys(), content.col_keys(), |slot| {
            content.major_array(slot)
        })
    }
}

/// Serializes an index: key tag, key count, keys in ordinal order.
pub fn write_index<K: IndexKey, W: Write>(index: &Index<K>, out: &mut W) -> Result<()> {
    out.write_all(&[K::KEY_TYPE.tag()])?;
    write_u32(out, count(index.len())?)?;
    write_keys(out, index)
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(format_error(format!(
                "unexpected end of input: needed {n} bytes at offset {}",
                self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn i128(&mut self) -> Result<i128> {
        Ok(i128::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| format_error(format!("invalid UTF-8 string: {e}")))
    }

    fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn optional_string(&mut self) -> Result<Option<String>> {
        if self.bool()? {
            self.string().map(Some)
        } else {
            Ok(None)
        }
    }

    fn date(&mut self) -> Result<Date> {
        let day = self.i32()?;
        Date::from_julian_day(day).map_err(|e| format_error(format!("invalid date: {e}")))
    }

    fn datetime(&mut self) -> Result<PrimitiveDateTime> {
        let nanos = self.i128()?;
        let utc = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|e| format_error(format!("invalid datetime: {e}")))?;
        Ok(PrimitiveDateTime::new(utc.date(), utc.time()))
    }

    fn value(&mut self) -> Result<Value> {
        Ok(match self.u8()? {
            0 => Value::Null,
            1 => Value::Bool(self.bool()?),
            2 => Value::Int(self.i32()?),
            3 => Value::Long(self.i64()?),
            4 => Value::Double(self.f64()?),
            5 => Value::Str(self.string()?),
            6 => Value::Date(self.date()?),
            7 => Value::DateTime(self.datetime()?),
            tag => return Err(format_error(format!("unknown value tag {tag}"))),
        })
    }

    fn key_value(&mut self, key_type: KeyType) -> Result<Value> {
        Ok(match key_type {
            KeyType::Int => Value::Int(self.i32()?),
            KeyType::Long => Value::Long(self.i64()?),
            KeyType::Double => Value::Double(self.f64()?),
            KeyType::Str => Value::Str(self.string()?),
            KeyType::Date => Value::Date(self.date()?),
            KeyType::DateTime => Value::DateTime(self.datetime()?),
            KeyType::Object => self.value()?,
        })
    }

    fn key<K: IndexKey>(&mut self) -> Result<K> {
        let value = self.key_value(K::KEY_TYPE)?;
        K::from_value(&value).ok_or_else(|| {
            format_error(format!(
                "cannot read {} key from {}",
                K::KEY_TYPE.name(),
                value.type_name()
            ))
        })
    }

    fn keys<K: IndexKey>(&mut self, n: usize) -> Result<Index<K>> {
        let mut keys = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            keys.push(self.key::<K>()?);
        }
        Index::new(keys)
    }

    fn values(&mut self, n: usize) -> Result<TypedArray> {
        let tag = self.u8()?;
        let array_type = ArrayType::from_tag(tag)
            .ok_or_else(|| format_error(format!("unknown element tag {tag}")))?;
        // every encoded value takes at least one byte
        if n > self.remaining() {
            return Err(format_error(format!(
                "{n} values announced but only {} bytes left",
                self.remaining()
            )));
        }
        Ok(match array_type {
            ArrayType::Boolean => {
                TypedArray::from((0..n).map(|_| self.bool()).collect::<Result<Vec<_>>>()?)
            }
            ArrayType::Int => TypedArray::from((0..n).map(|_| self.i32()).collect::<Result<Vec<_>>>()?),
            ArrayType::Long => TypedArray::from((0..n).map(|_| self.i64()).collect::<Result<Vec<_>>>()?),
            ArrayType::Double => {
                TypedArray::from((0..n).map(|_| self.f64()).collect::<Result<Vec<_>>>()?)
            }
            ArrayType::Str => TypedArray::from(
                (0..n)
                    .map(|_| self.optional_string())
                    .collect::<Result<Vec<_>>>()?,
            ),
            ArrayType::Object => {
                TypedArray::from((0..n).map(|_| self.value()).collect::<Result<Vec<_>>>()?)
            }
        })
    }

    /// Reads `major` records of `[key, values]`, each with `minor` values
    fn records<K: IndexKey>(&mut self, major: usize, minor: usize) -> Result<Vec<(K, TypedArray)>> {
        let mut records = Vec::with_capacity(major.min(self.remaining()));
        for _ in 0..major {
            let key = self.key::<K>()?;
            let array = self.values(minor)?;
            records.push((key, array));
        }
        Ok(records)
    }
}

/// Reads a table written by [`write_content`].
///
/// # Errors
/// [`FrameError::Format`] on bad magic, an unknown version, truncated input,
/// or key tags that do not match `R` and `C`.
pub fn read_content<R: IndexKey, C: IndexKey>(bytes: &[u8]) -> Result<Content<R, C>> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(MAGIC.len())? != MAGIC {
        return Err(format_error("bad magic"));
    }
    let version = reader.u8()?;
    if version != VERSION {
        return Err(format_error(format!("unsupported version {version}")));
    }
    let rows = reader.u32()? as usize;
    let cols = reader.u32()? as usize;
    let (row_tag, col_tag) = (reader.u8()?, reader.u8()?);
    if row_tag != R::KEY_TYPE.tag() || col_tag != C::KEY_TYPE.tag() {
        return Err(format_error(format!(
            "key tags ({row_tag}, {col_tag}) do not match ({}, {})",
            R::KEY_TYPE.name(),
            C::KEY_TYPE.name()
        )));
    }
    let column_store = reader.u8()? != 0;

    let content = if column_store {
        let row_keys = reader.keys::<R>(rows)?;
        let columns = reader.records::<C>(cols, rows)?;
        Content::from_columns(row_keys, columns)?
    } else {
        let col_keys = reader.keys::<C>(cols)?;
        let rows = reader.records::<R>(rows, cols)?;
        Content::from_columns(col_keys, rows)?.transpose()
    };
    if reader.remaining() > 0 {
        return Err(format_error(format!(
            "{} trailing bytes after table",
            reader.remaining()
        )));
    }
    Ok(content)
}

fn index_header(reader: &mut ByteReader<'_>) -> Result<(KeyType, usize)> {
    let tag = reader.u8()?;
    let key_type =
        KeyType::from_tag(tag).ok_or_else(|| format_error(format!("unknown key tag {tag}")))?;
    let len = reader.u32()? as usize;
    Ok((key_type, len))
}

/// Reads an index written by [`write_index`] whose key type is known statically.
pub fn read_index<K: IndexKey>(bytes: &[u8]) -> Result<Index<K>> {
    let mut reader = ByteReader::new(bytes);
    let (key_type, len) = index_header(&mut reader)?;
    if key_type != K::KEY_TYPE {
        return Err(format_error(format!(
            "expected {} keys, found {}",
            K::KEY_TYPE.name(),
            key_type.name()
        )));
    }
    reader.keys(len)
}

/// Reads an index of whatever key type its header names
pub fn read_index_dyn(factory: &IndexFactory, bytes: &[u8]) -> Result<DynIndex> {
    let mut reader = ByteReader::new(bytes);
    let (key_type, len) = index_header(&mut reader)?;
    let mut values = Vec::with_capacity(len.min(reader.remaining()));
    for _ in 0..len {
        values.push(reader.key_value(key_type)?);
    }
    factory.create_dynamic(key_type, &values)
}

impl<R: IndexKey, C: IndexKey> Content<R, C> {
    /// Writes the table to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        write_content(self, &mut out)?;
        out.flush()?;
        debug!(
            path = %path.display(),
            rows = self.row_count(),
            cols = self.col_count(),
            "saved content"
        );
        Ok(())
    }

    /// Reads a table from a memory-mapped file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let content = read_content(&mmap)?;
        debug!(
            path = %path.display(),
            bytes = mmap.len(),
            rows = content.row_count(),
            cols = content.col_count(),
            "loaded content"
        );
        Ok(content)
    }
}
