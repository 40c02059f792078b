use parquet_format_safe::SchemaElement;

use super::super::types::ParquetType;

impl ParquetType {
    /// Method to convert to Thrift. The returned elements are in depth-first
    /// order; the caller passes the root of the schema.
    pub fn to_thrift(&self) -> Vec<SchemaElement> {
        let mut elements: Vec<SchemaElement> = Vec::new();
        to_thrift_helper(self, &mut elements, true);
        elements
    }
}

/// Constructs list of `SchemaElement` from the schema using depth-first traversal.
/// Here we assume that schema is always valid and starts with group type.
fn to_thrift_helper(schema: &ParquetType, elements: &mut Vec<SchemaElement>, is_root: bool) {
    match schema {
        ParquetType::PrimitiveType(primitive) => {
            let (type_, type_length) = primitive.physical_type.into();
            let (converted_type, maybe_decimal) = primitive
                .converted_type
                .map(|x| {
                    let (ty, maybe_decimal) = x.into();
                    (Some(ty), maybe_decimal)
                })
                .unwrap_or((None, None));

            let element = SchemaElement {
                type_: Some(type_),
                type_length,
                repetition_type: Some(primitive.field_info.repetition.into()),
                name: primitive.field_info.name.clone(),
                num_children: None,
                converted_type,
                precision: maybe_decimal.map(|x| x.0),
                scale: maybe_decimal.map(|x| x.1),
                field_id: primitive.field_info.id,
                logical_type: primitive.logical_type.map(|x| x.into()),
            };

            elements.push(element);
        }
        ParquetType::GroupType {
            field_info,
            fields,
            logical_type,
            converted_type,
        } => {
            // the root of the schema does not have a repetition
            // https://github.com/apache/parquet-format/blob/7f06e838cbd1b7dbd722ff2580b9c2525e37fc46/src/main/thrift/parquet.thrift#L363
            let repetition_type = if is_root {
                None
            } else {
                Some(field_info.repetition.into())
            };

            let element = SchemaElement {
                type_: None,
                type_length: None,
                repetition_type,
                name: field_info.name.clone(),
                num_children: Some(fields.len() as i32),
                converted_type: converted_type.map(|x| x.into()),
                scale: None,
                precision: None,
                field_id: field_info.id,
                logical_type: logical_type.map(|x| x.into()),
            };

            elements.push(element);

            // Add child elements for a group
            for field in fields {
                to_thrift_helper(field, elements, false);
            }
        }
    }
}
