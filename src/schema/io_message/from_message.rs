//! Parser of the message-format textual representation of a schema, e.g.
//!
//! ```text
//! message spark_schema {
//!   REQUIRED INT64 id;
//!   OPTIONAL BYTE_ARRAY name (UTF8);
//!   OPTIONAL group prices (LIST) {
//!     REPEATED group list {
//!       OPTIONAL DOUBLE element;
//!     }
//!   }
//! }
//! ```

use crate::error::{Error, Result};
use crate::schema::types::{
    GroupConvertedType, ParquetType, PhysicalType, PrimitiveConvertedType,
};
use crate::schema::Repetition;

/// Parses a message-format schema into a [`ParquetType`] tree.
pub fn from_message(message: &str) -> Result<ParquetType> {
    let mut parser = Parser {
        tokenizer: Tokenizer::new(message),
    };
    parser.parse_message()
}

/// Splits the input on whitespace, treating the structural characters as
/// their own tokens.
struct Tokenizer<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn is_special(c: char) -> bool {
        matches!(c, '{' | '}' | '(' | ')' | ';' | ',' | '=')
    }

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        while self.position < bytes.len() && (bytes[self.position] as char).is_whitespace() {
            self.position += 1;
        }
        if self.position == bytes.len() {
            return None;
        }
        let start = self.position;
        let first = bytes[self.position] as char;
        if Self::is_special(first) {
            self.position += 1;
            return Some(&self.text[start..self.position]);
        }
        while self.position < bytes.len() {
            let c = bytes[self.position] as char;
            if c.is_whitespace() || Self::is_special(c) {
                break;
            }
            self.position += 1;
        }
        Some(&self.text[start..self.position])
    }
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
}

fn parse_repetition(token: &str) -> Result<Repetition> {
    match token.to_uppercase().as_str() {
        "REQUIRED" => Ok(Repetition::Required),
        "OPTIONAL" => Ok(Repetition::Optional),
        "REPEATED" => Ok(Repetition::Repeated),
        other => Err(Error::InvalidParameter(format!(
            "expected a repetition, found \"{}\"",
            other
        ))),
    }
}

fn parse_physical_type(token: &str) -> Option<PhysicalType> {
    Some(match token.to_uppercase().as_str() {
        "BOOLEAN" => PhysicalType::Boolean,
        "INT32" => PhysicalType::Int32,
        "INT64" => PhysicalType::Int64,
        "INT96" => PhysicalType::Int96,
        "FLOAT" => PhysicalType::Float,
        "DOUBLE" => PhysicalType::Double,
        "BYTE_ARRAY" | "BINARY" => PhysicalType::ByteArray,
        // the length is parsed by the caller
        "FIXED_LEN_BYTE_ARRAY" => PhysicalType::FixedLenByteArray(0),
        _ => return None,
    })
}

fn parse_primitive_converted(
    name: &str,
    maybe_decimal: Option<(usize, usize)>,
) -> Result<PrimitiveConvertedType> {
    use PrimitiveConvertedType::*;
    Ok(match name.to_uppercase().as_str() {
        "UTF8" => Utf8,
        "ENUM" => Enum,
        "DECIMAL" => {
            let (precision, scale) = maybe_decimal
                .ok_or_else(|| Error::InvalidParameter("DECIMAL requires a precision".to_string()))?;
            Decimal(precision, scale)
        }
        "DATE" => Date,
        "TIME_MILLIS" => TimeMillis,
        "TIME_MICROS" => TimeMicros,
        "TIMESTAMP_MILLIS" => TimestampMillis,
        "TIMESTAMP_MICROS" => TimestampMicros,
        "UINT_8" => Uint8,
        "UINT_16" => Uint16,
        "UINT_32" => Uint32,
        "UINT_64" => Uint64,
        "INT_8" => Int8,
        "INT_16" => Int16,
        "INT_32" => Int32,
        "INT_64" => Int64,
        "JSON" => Json,
        "BSON" => Bson,
        "INTERVAL" => Interval,
        other => {
            return Err(Error::InvalidParameter(format!(
                "unknown annotation \"{}\"",
                other
            )))
        }
    })
}

impl<'a> Parser<'a> {
    fn next_token(&mut self) -> Result<&'a str> {
        self.tokenizer
            .next()
            .ok_or_else(|| Error::InvalidParameter("schema message ended unexpectedly".to_string()))
    }

    fn expect(&mut self, expected: &str) -> Result<()> {
        let token = self.next_token()?;
        if token != expected {
            return Err(Error::InvalidParameter(format!(
                "expected \"{}\", found \"{}\"",
                expected, token
            )));
        }
        Ok(())
    }

    fn parse_number(&mut self) -> Result<usize> {
        let token = self.next_token()?;
        token.parse().map_err(|_| {
            Error::InvalidParameter(format!("expected a number, found \"{}\"", token))
        })
    }

    fn parse_message(&mut self) -> Result<ParquetType> {
        let token = self.next_token()?;
        if !token.eq_ignore_ascii_case("message") {
            return Err(Error::InvalidParameter(format!(
                "a schema message must start with \"message\", found \"{}\"",
                token
            )));
        }
        let name = self.next_token()?.to_string();
        self.expect("{")?;
        let fields = self.parse_fields()?;
        Ok(ParquetType::new_root(name, fields))
    }

    // parses fields until the closing brace, consuming it
    fn parse_fields(&mut self) -> Result<Vec<ParquetType>> {
        let mut fields = vec![];
        loop {
            let token = self.next_token()?;
            if token == "}" {
                return Ok(fields);
            }
            fields.push(self.parse_field(token)?);
        }
    }

    // parses `(ANNOTATION)` or `(ANNOTATION(p[, s]))`, returning the raw
    // name and the optional numeric arguments
    fn parse_annotation(&mut self) -> Result<(String, Option<(usize, usize)>)> {
        let name = self.next_token()?.to_string();
        let mut args = None;
        let token = self.next_token()?;
        match token {
            ")" => {}
            "(" => {
                let precision = self.parse_number()?;
                let token = self.next_token()?;
                let scale = match token {
                    "," => {
                        let scale = self.parse_number()?;
                        self.expect(")")?;
                        scale
                    }
                    ")" => 0,
                    other => {
                        return Err(Error::InvalidParameter(format!(
                            "expected \",\" or \")\", found \"{}\"",
                            other
                        )))
                    }
                };
                args = Some((precision, scale));
                self.expect(")")?;
            }
            other => {
                return Err(Error::InvalidParameter(format!(
                    "expected \")\" or \"(\", found \"{}\"",
                    other
                )))
            }
        }
        Ok((name, args))
    }

    fn parse_field(&mut self, repetition_token: &str) -> Result<ParquetType> {
        let repetition = parse_repetition(repetition_token)?;
        let type_token = self.next_token()?;

        if type_token.eq_ignore_ascii_case("group") {
            let name = self.next_token()?.to_string();
            let mut converted_type = None;
            let token = self.next_token()?;
            let token = if token == "(" {
                let (annotation, _) = self.parse_annotation()?;
                converted_type = Some(match annotation.to_uppercase().as_str() {
                    "LIST" => GroupConvertedType::List,
                    "MAP" => GroupConvertedType::Map,
                    "MAP_KEY_VALUE" => GroupConvertedType::MapKeyValue,
                    other => {
                        return Err(Error::InvalidParameter(format!(
                            "unknown group annotation \"{}\"",
                            other
                        )))
                    }
                });
                self.next_token()?
            } else {
                token
            };
            if token != "{" {
                return Err(Error::InvalidParameter(format!(
                    "expected \"{{\", found \"{}\"",
                    token
                )));
            }
            let fields = self.parse_fields()?;
            Ok(ParquetType::from_converted(
                name,
                fields,
                repetition,
                converted_type,
                None,
            ))
        } else {
            let mut physical_type = parse_physical_type(type_token).ok_or_else(|| {
                Error::InvalidParameter(format!("unknown type \"{}\"", type_token))
            })?;
            if let PhysicalType::FixedLenByteArray(_) = physical_type {
                self.expect("(")?;
                let length = self.parse_number()?;
                self.expect(")")?;
                physical_type = PhysicalType::FixedLenByteArray(length);
            }
            let name = self.next_token()?.to_string();

            let mut converted_type = None;
            let token = self.next_token()?;
            let token = if token == "(" {
                let (annotation, args) = self.parse_annotation()?;
                converted_type = Some(parse_primitive_converted(&annotation, args)?);
                self.next_token()?
            } else {
                token
            };
            if token != ";" {
                return Err(Error::InvalidParameter(format!(
                    "expected \";\", found \"{}\"",
                    token
                )));
            }

            ParquetType::try_from_primitive(
                name,
                physical_type,
                repetition,
                converted_type,
                None,
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_schema() -> crate::error::Result<()> {
        let schema = from_message(
            "message schema {
                REQUIRED INT64 id;
                OPTIONAL BYTE_ARRAY name (UTF8);
                OPTIONAL DOUBLE value;
            }",
        )?;
        assert_eq!(schema.name(), "schema");
        if let ParquetType::GroupType { fields, .. } = &schema {
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[0].name(), "id");
            assert_eq!(
                fields[0].get_field_info().repetition,
                Repetition::Required
            );
        } else {
            panic!("expected a group")
        }
        Ok(())
    }

    #[test]
    fn fixed_len_and_decimal() -> crate::error::Result<()> {
        let schema = from_message(
            "message m {
                OPTIONAL FIXED_LEN_BYTE_ARRAY (16) id;
                OPTIONAL INT64 price (DECIMAL(18, 4));
            }",
        )?;
        if let ParquetType::GroupType { fields, .. } = &schema {
            assert_eq!(
                fields[0],
                ParquetType::try_from_primitive(
                    "id".to_string(),
                    PhysicalType::FixedLenByteArray(16),
                    Repetition::Optional,
                    None,
                    None,
                    None
                )?
            );
            assert_eq!(
                fields[1],
                ParquetType::try_from_primitive(
                    "price".to_string(),
                    PhysicalType::Int64,
                    Repetition::Optional,
                    Some(PrimitiveConvertedType::Decimal(18, 4)),
                    None,
                    None
                )?
            );
        } else {
            panic!("expected a group")
        }
        Ok(())
    }

    #[test]
    fn nested_groups() -> crate::error::Result<()> {
        let schema = from_message(
            "message m {
                OPTIONAL group prices (LIST) {
                    REPEATED group list {
                        OPTIONAL DOUBLE element;
                    }
                }
            }",
        )?;
        if let ParquetType::GroupType { fields, .. } = &schema {
            assert!(matches!(fields[0], ParquetType::GroupType { .. }));
        } else {
            panic!("expected a group")
        }
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(from_message("messag m {}").is_err());
        assert!(from_message("message m { REQUIRED UNKNOWN x; }").is_err());
        assert!(from_message("message m { REQUIRED INT32 x }").is_err());
        assert!(from_message("message m {").is_err());
    }
}
