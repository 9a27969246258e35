use std::{
    fmt::{self},
    hash::{Hash, Hasher},
    io::Read,
};

use crate::{
    error::DbError,
    io::{ByteWriter, Decodeable, Encodeable, read_exact},
    storage::{
        page_id::HeapPageID,
        schema::{Schema, Type},
    },
};

/// A single field value. Comparison is only defined within a type;
/// ordering across types is a programmer error and panics.
#[derive(Debug, Clone)]
pub enum Cell {
    Int(i32),
    String(String),
}

impl Cell {
    pub fn get_int(&self) -> Result<i32, DbError> {
        match self {
            Cell::Int(v) => Ok(*v),
            _ => Err(DbError::IllegalArgument(format!(
                "not an int cell: {:?}",
                self
            ))),
        }
    }

    pub fn get_string(&self) -> Result<String, DbError> {
        match self {
            Cell::String(v) => Ok(v.clone()),
            _ => Err(DbError::IllegalArgument(format!(
                "not a string cell: {:?}",
                self
            ))),
        }
    }

    /// Whether this value can live in a column of the given type.
    pub fn matches_type(&self, t: Type) -> bool {
        match (self, t) {
            (Cell::Int(_), Type::Int) => true,
            (Cell::String(s), Type::Str(width)) => s.len() <= width,
            _ => false,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.partial_cmp(b),
            (Cell::String(a), Cell::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other)
            .expect("cross-type cell comparison")
    }
}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Cell::Int(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Cell::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

pub struct Tuple {
    cells: Vec<Cell>,
}

// constructors
impl Tuple {
    pub fn new_from_cells(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }

    /// Decode one tuple laid out according to `schema`.
    ///
    /// Integers are 4-byte big-endian; strings are a 4-byte big-endian
    /// length prefix followed by the payload zero-padded to the column
    /// width.
    pub fn read_from<R: Read>(reader: &mut R, schema: &Schema) -> Self {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            match field.field_type {
                Type::Int => {
                    cells.push(Cell::Int(i32::decode_from(reader)));
                }
                Type::Str(width) => {
                    let len = u32::decode_from(reader) as usize;
                    let payload = read_exact(reader, width);
                    let len = len.min(width);
                    let s = String::from_utf8(payload[..len].to_vec())
                        .expect("invalid utf-8 in string field");
                    cells.push(Cell::String(s));
                }
            }
        }
        Tuple { cells }
    }

    /// Encode this tuple into `writer`, padded to the schema's fixed
    /// field widths. Inverse of `read_from`.
    pub fn write_to(&self, writer: &mut ByteWriter, schema: &Schema) {
        for (cell, field) in self.cells.iter().zip(&schema.fields) {
            match (cell, field.field_type) {
                (Cell::Int(v), Type::Int) => {
                    writer.write(v);
                }
                (Cell::String(s), Type::Str(width)) => {
                    writer.write(&(s.len() as u32));
                    let mut payload = s.as_bytes().to_vec();
                    payload.resize(width, 0);
                    writer.write_bytes(&payload);
                }
                _ => panic!(
                    "tuple does not match schema: {:?} vs {}",
                    cell, field.field_type
                ),
            }
        }
    }

    /// Tuple of `width` integer columns, all set to `value`.
    pub fn new_int_tuple(value: i32, width: usize) -> Self {
        let mut cells: Vec<Cell> = Vec::new();
        for _ in 0..width {
            cells.push(Cell::Int(value));
        }

        Tuple { cells }
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn field_count(&self) -> usize {
        self.cells.len()
    }

    pub fn matches_schema(&self, schema: &Schema) -> bool {
        self.cells.len() == schema.fields.len()
            && self
                .cells
                .iter()
                .zip(&schema.fields)
                .all(|(c, f)| c.matches_type(f.field_type))
    }

    pub fn clone(&self) -> Tuple {
        Tuple {
            cells: self.cells.clone(),
        }
    }
}

impl Encodeable for Tuple {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for cell in &self.cells {
            match cell {
                Cell::Int(v) => bytes.extend_from_slice(&v.to_be_bytes()),
                Cell::String(s) => {
                    bytes.extend_from_slice(&(s.len() as u32).to_be_bytes());
                    bytes.extend_from_slice(s.as_bytes());
                }
            }
        }
        bytes
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        if self.cells.len() != other.cells.len() {
            return false;
        }

        for (i, cell) in self.cells.iter().enumerate() {
            if cell != &other.cells[i] {
                return false;
            }
        }

        return true;
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            let cell_str = format!("{:?}, ", cell);
            content.push_str(&cell_str);
        }
        content = content[..content.len() - 2].to_string();
        content.push_str(&"}");
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A tuple placed on a page: the record id is the `(pid, slot)` pair.
///
/// Operators that synthesize tuples (join, aggregate) wrap them with
/// `new_unplaced`; such tuples carry no meaningful address and must not
/// be handed to a delete.
#[derive(PartialEq)]
pub struct WrappedTuple {
    internal: Tuple,
    slot_number: usize,
    pid: HeapPageID,
}

impl std::ops::Deref for WrappedTuple {
    type Target = Tuple;
    fn deref(&self) -> &Self::Target {
        &self.internal
    }
}

impl std::ops::DerefMut for WrappedTuple {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.internal
    }
}

impl WrappedTuple {
    pub fn new(internal: Tuple, slot_number: usize, pid: HeapPageID) -> WrappedTuple {
        WrappedTuple {
            internal,
            slot_number,
            pid,
        }
    }

    pub fn new_unplaced(internal: Tuple) -> WrappedTuple {
        WrappedTuple {
            internal,
            slot_number: 0,
            pid: HeapPageID::new(0, 0),
        }
    }

    pub fn get_slot_number(&self) -> usize {
        self.slot_number
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn into_tuple(self) -> Tuple {
        self.internal
    }
}

impl Clone for WrappedTuple {
    fn clone(&self) -> Self {
        WrappedTuple {
            internal: self.internal.clone(),
            slot_number: self.slot_number,
            pid: self.pid,
        }
    }
}

impl Eq for WrappedTuple {}

impl fmt::Display for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.internal)
    }
}

impl fmt::Debug for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::storage::schema::{FieldItem, STRING_FIELD_LEN};
    use crate::utils::init_log;

    #[test]
    fn test_tuple_round_trip() {
        init_log();

        let schema = Schema::new(vec![
            FieldItem::new("id", Type::Int),
            FieldItem::new("name", Type::Str(STRING_FIELD_LEN)),
        ]);

        let tuple =
            Tuple::new_from_cells(&[Cell::Int(7), Cell::String("alice".to_string())]);
        assert!(tuple.matches_schema(&schema));

        let mut writer = ByteWriter::new();
        tuple.write_to(&mut writer, &schema);
        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), schema.get_size());

        let decoded = Tuple::read_from(&mut Cursor::new(bytes), &schema);
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn test_schema_mismatch() {
        let schema = small_schema();
        let wrong_arity = Tuple::new_int_tuple(1, 3);
        assert!(!wrong_arity.matches_schema(&schema));

        let wrong_type =
            Tuple::new_from_cells(&[Cell::String("x".to_string()), Cell::Int(1)]);
        assert!(!wrong_type.matches_schema(&schema));
    }

    #[test]
    fn test_cell_order() {
        assert!(Cell::Int(1) < Cell::Int(2));
        assert!(Cell::String("a".to_string()) < Cell::String("b".to_string()));
        assert_ne!(Cell::Int(1), Cell::String("1".to_string()));
    }

    fn small_schema() -> Schema {
        crate::storage::schema::small_int_schema(2, "")
    }
}
