use core::fmt;

use itertools::Itertools;

/// Default byte width of a string column.
pub const STRING_FIELD_LEN: usize = 128;

/// Column type. Strings are fixed-width on disk: a 4-byte big-endian
/// length prefix followed by the payload zero-padded to the declared
/// width.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    Str(usize),
}

impl Type {
    /// On-disk footprint of one field of this type.
    pub fn get_len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str(width) => width + 4,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Str(width) => write!(f, "STR({})", width),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldItem {
    pub field_type: Type,
    pub field_name: String,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> Self {
        Self {
            field_type,
            field_name: field_name.to_string(),
        }
    }
}

/// Ordered field list of a table or of an operator's output.
///
/// Equality ignores field names and compares types positionally, so a
/// scan over `(a INT, b INT)` and a join output `(x INT, y INT)` carry
/// equal schemas.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Self {
        assert!(!fields.is_empty(), "a schema needs at least one field");
        Self { fields }
    }

    pub fn merge(schema1: Schema, schema2: Schema) -> Schema {
        let mut new_schema = Schema {
            ..Default::default()
        };

        for f in schema1.fields {
            new_schema.fields.push(f);
        }
        for f in schema2.fields {
            new_schema.fields.push(f);
        }

        new_schema
    }

    /// Tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.get_len()).sum()
    }

    pub fn get_field_pos(&self, field_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_name == field_name)
    }

    pub fn get_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }

        self.fields
            .iter()
            .zip(&other.fields)
            .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({})",
            self.fields
                .iter()
                .map(|field| format!("{} {}", field.field_name, field.field_type))
                .join(", ")
        )
    }
}

/// Schema of `width` integer columns, used all over the tests.
pub fn small_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem {
            field_name: format!("{}-{}", name_prefix, i),
            field_type: Type::Int,
        };
        fields.push(field);
    }

    Schema { fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_names() {
        let a = small_int_schema(2, "left");
        let b = small_int_schema(2, "right");
        assert_eq!(a, b);

        let c = small_int_schema(3, "left");
        assert_ne!(a, c);

        let d = Schema::new(vec![
            FieldItem::new("x", Type::Int),
            FieldItem::new("y", Type::Str(STRING_FIELD_LEN)),
        ]);
        assert_ne!(a, d);
    }

    #[test]
    fn test_size_and_merge() {
        let schema = Schema::new(vec![
            FieldItem::new("id", Type::Int),
            FieldItem::new("name", Type::Str(STRING_FIELD_LEN)),
        ]);
        assert_eq!(schema.get_size(), 4 + STRING_FIELD_LEN + 4);

        let merged = Schema::merge(schema.clone(), small_int_schema(2, ""));
        assert_eq!(merged.fields.len(), 4);
        assert_eq!(merged.get_size(), schema.get_size() + 8);
        assert_eq!(merged.get_field_pos("name"), Some(1));
    }
}
