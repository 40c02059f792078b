use parquet_format_safe::SchemaElement;

use super::column_descriptor::{ColumnDescriptor, Descriptor};
use crate::error::{Error, Result};
use crate::schema::io_message::from_message;
use crate::schema::types::ParquetType;
use crate::schema::Repetition;

/// A schema descriptor. This encapsulates the top-level schemas for all the columns,
/// as well as all descriptors for all the primitive columns.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    name: String,
    // The top-level schema (the "message" type).
    fields: Vec<ParquetType>,

    // All the descriptors for primitive columns in this schema, constructed from
    // `schema` in DFS order.
    leaves: Vec<ColumnDescriptor>,
}

impl SchemaDescriptor {
    /// Creates new schema descriptor from Parquet schema.
    pub fn new(name: String, fields: Vec<ParquetType>) -> Self {
        let mut leaves = vec![];
        for f in &fields {
            let mut path = vec![];
            build_tree(f, f, 0, 0, &mut leaves, &mut path);
        }

        Self {
            name,
            fields,
            leaves,
        }
    }

    /// The [`ColumnDescriptor`] (leaves) of this schema.
    ///
    /// Note that, for nested fields, this may contain more entries than the number of fields
    /// in the file - e.g. a struct field may have two columns.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.leaves
    }

    /// The schemas' name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schemas' fields.
    pub fn fields(&self) -> &[ParquetType] {
        &self.fields
    }

    /// The schemas' root (also known as "message") type.
    pub fn root(&self) -> ParquetType {
        ParquetType::new_root(self.name.clone(), self.fields.clone())
    }

    pub(crate) fn into_thrift(self) -> Vec<SchemaElement> {
        self.root().to_thrift()
    }

    pub(crate) fn try_from_thrift(elements: &[SchemaElement]) -> Result<Self> {
        let elements = elements.iter().collect::<Vec<_>>();
        let schema = ParquetType::try_from_thrift(&elements)?;
        let (name, fields) = match schema {
            ParquetType::GroupType {
                field_info, fields, ..
            } => (field_info.name, fields),
            _ => return Err(Error::oos("The parquet schema root must be a group type")),
        };
        Ok(Self::new(name, fields))
    }

    /// Creates a schema from the message-format text representation.
    pub fn try_from_message(message: &str) -> Result<Self> {
        let schema = from_message(message)?;
        let (name, fields) = match schema {
            ParquetType::GroupType {
                field_info, fields, ..
            } => (field_info.name, fields),
            _ => unreachable!("from_message always returns a root group"),
        };
        Ok(Self::new(name, fields))
    }
}

/// Walks the tree in depth-first order deriving, for every leaf, the maximum
/// definition and repetition levels. The root is REQUIRED and contributes
/// zero to both.
fn build_tree<'a>(
    tp: &'a ParquetType,
    base_tp: &ParquetType,
    mut max_rep_level: i16,
    mut max_def_level: i16,
    leaves: &mut Vec<ColumnDescriptor>,
    path_so_far: &mut Vec<&'a str>,
) {
    path_so_far.push(tp.name());
    match tp.get_field_info().repetition {
        Repetition::Optional => {
            max_def_level += 1;
        }
        Repetition::Repeated => {
            max_def_level += 1;
            max_rep_level += 1;
        }
        Repetition::Required => {}
    }

    match tp {
        ParquetType::PrimitiveType(p) => {
            let path_in_schema = path_so_far.iter().copied().map(String::from).collect();
            leaves.push(ColumnDescriptor::new(
                Descriptor {
                    primitive_type: p.clone(),
                    max_def_level,
                    max_rep_level,
                },
                path_in_schema,
                base_tp.clone(),
            ));
        }
        ParquetType::GroupType { ref fields, .. } => {
            for f in fields {
                build_tree(
                    f,
                    base_tp,
                    max_rep_level,
                    max_def_level,
                    leaves,
                    path_so_far,
                );
                path_so_far.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PhysicalType;

    #[test]
    fn levels_of_flat_required() {
        let schema = SchemaDescriptor::try_from_message(
            "message m { REQUIRED INT64 a; OPTIONAL INT32 b; }",
        )
        .unwrap();
        assert_eq!(schema.columns().len(), 2);
        assert_eq!(schema.columns()[0].descriptor.max_def_level, 0);
        assert_eq!(schema.columns()[0].descriptor.max_rep_level, 0);
        assert_eq!(schema.columns()[1].descriptor.max_def_level, 1);
        assert_eq!(schema.columns()[1].descriptor.max_rep_level, 0);
    }

    #[test]
    fn levels_of_nested() {
        let schema = SchemaDescriptor::try_from_message(
            "message m {
                OPTIONAL group prices (LIST) {
                    REPEATED group list {
                        OPTIONAL DOUBLE element;
                    }
                }
            }",
        )
        .unwrap();
        assert_eq!(schema.columns().len(), 1);
        let descriptor = &schema.columns()[0].descriptor;
        assert_eq!(descriptor.max_def_level, 3);
        assert_eq!(descriptor.max_rep_level, 1);
        assert_eq!(descriptor.primitive_type.physical_type, PhysicalType::Double);
        assert_eq!(
            schema.columns()[0].path_in_schema,
            vec!["prices".to_string(), "list".to_string(), "element".to_string()]
        );
    }

    #[test]
    fn round_trips_through_thrift() {
        let schema = SchemaDescriptor::try_from_message(
            "message m { REQUIRED INT64 a; OPTIONAL BYTE_ARRAY b (UTF8); }",
        )
        .unwrap();
        let elements = schema.clone().into_thrift();
        let recovered = SchemaDescriptor::try_from_thrift(&elements).unwrap();
        assert_eq!(recovered.name(), schema.name());
        assert_eq!(recovered.fields(), schema.fields());
    }
}
