// AMF0 value

use byteorder::{BigEndian, ByteOrder};

use super::AMFDecodingCursor;

const AMF0_TYPE_NUMBER: u8 = 0x00;
const AMF0_TYPE_BOOL: u8 = 0x01;
const AMF0_TYPE_STRING: u8 = 0x02;
const AMF0_TYPE_OBJECT: u8 = 0x03;
const AMF0_TYPE_NULL: u8 = 0x05;
const AMF0_TYPE_UNDEFINED: u8 = 0x06;
const AMF0_TYPE_ECMA_ARRAY: u8 = 0x08;
const AMF0_TYPE_DATE: u8 = 0x0B;
const AMF0_TYPE_LONG_STRING: u8 = 0x0C;

const AMF0_OBJECT_TERM_CODE: u8 = 0x09;

/// Min string byte length for the encoder to pick the long string form
const AMF0_LONG_STRING_MIN_LEN: usize = 0x10000;

/// Property list of an object or ECMA array
/// Kept as a list of pairs, so key order survives an encode + decode cycle
pub type AMF0Properties = Vec<(String, AMF0Value)>;

/// AMF0 compatible value
#[derive(Clone, Debug, PartialEq)]
pub enum AMF0Value {
    Number {
        value: f64,
    },
    Bool {
        value: bool,
    },
    String {
        value: String,
    },
    LongString {
        value: String,
    },
    Object {
        properties: AMF0Properties,
    },
    EcmaArray {
        properties: AMF0Properties,
    },
    Null,
    Undefined,
}

impl AMF0Value {
    /// Obtains a string representation of the value
    /// Used for debug logging purposes
    pub fn to_debug_string(&self, tabs: &str) -> String {
        match self {
            AMF0Value::Number { value } => {
                format!("{}", value)
            }
            AMF0Value::Bool { value } => {
                if *value {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            AMF0Value::String { value } => {
                format!("'{}'", value)
            }
            AMF0Value::LongString { value } => {
                format!("L'{}'", value)
            }
            AMF0Value::Object { properties } => {
                Self::properties_to_debug_string(properties, "{", "}", tabs)
            }
            AMF0Value::EcmaArray { properties } => {
                Self::properties_to_debug_string(properties, "ARRAY [", "]", tabs)
            }
            AMF0Value::Null => "NULL".to_string(),
            AMF0Value::Undefined => "UNDEFINED".to_string(),
        }
    }

    fn properties_to_debug_string(
        properties: &AMF0Properties,
        open: &str,
        close: &str,
        tabs: &str,
    ) -> String {
        let mut res = format!("{}\n", open);

        for (key, value) in properties.iter() {
            res.push_str(tabs);
            res.push_str("    '");
            res.push_str(key);
            res.push_str("' = ");
            res.push_str(&value.to_debug_string(&format!("{}    ", tabs)));
            res.push('\n');
        }

        res.push_str(tabs);
        res.push_str(close);

        res
    }

    // Value check functions:

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, AMF0Value::Undefined)
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AMF0Value::Null)
    }

    /// Returns the value as boolean
    pub fn get_bool(&self) -> bool {
        match self {
            AMF0Value::Bool { value } => *value,
            AMF0Value::Number { value } => *value != 0.0,
            _ => false,
        }
    }

    /// Returns the value as integer
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF0Value::Number { value } => *value as i64,
            _ => 0,
        }
    }

    /// Returns the value as float
    pub fn get_float(&self) -> f64 {
        match self {
            AMF0Value::Number { value } => *value,
            _ => 0.0,
        }
    }

    /// Returns the value as string
    pub fn get_string(&self) -> &str {
        match self {
            AMF0Value::String { value } => value.as_str(),
            AMF0Value::LongString { value } => value.as_str(),
            _ => "",
        }
    }

    /// Returns the value properties (for objects and ECMA arrays)
    pub fn get_object(&self) -> Option<&AMF0Properties> {
        match self {
            AMF0Value::Object { properties } => Some(properties),
            AMF0Value::EcmaArray { properties } => Some(properties),
            _ => None,
        }
    }

    /// Gets the value of a property (for objects)
    pub fn get_object_property(&self, property_name: &str) -> Option<&AMF0Value> {
        let obj = self.get_object()?;

        obj.iter()
            .find(|(key, _)| key == property_name)
            .map(|(_, value)| value)
    }

    // Encoding functions:

    /// Encodes value into bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AMF0Value::Number { value } => {
                let mut buf = vec![AMF0_TYPE_NUMBER];
                buf.extend(Self::encode_number(*value));
                buf
            }
            AMF0Value::Bool { value } => {
                let mut buf = vec![AMF0_TYPE_BOOL];
                buf.extend(Self::encode_bool(*value));
                buf
            }
            AMF0Value::String { value } => {
                if value.len() >= AMF0_LONG_STRING_MIN_LEN {
                    let mut buf = vec![AMF0_TYPE_LONG_STRING];
                    buf.extend(Self::encode_long_string(value));
                    buf
                } else {
                    let mut buf = vec![AMF0_TYPE_STRING];
                    buf.extend(Self::encode_string(value));
                    buf
                }
            }
            AMF0Value::LongString { value } => {
                let mut buf = vec![AMF0_TYPE_LONG_STRING];
                buf.extend(Self::encode_long_string(value));
                buf
            }
            AMF0Value::Object { properties } => {
                let mut buf = vec![AMF0_TYPE_OBJECT];
                buf.extend(Self::encode_object(properties));
                buf
            }
            AMF0Value::EcmaArray { properties } => {
                let mut buf = vec![AMF0_TYPE_ECMA_ARRAY];
                buf.extend(Self::encode_ecma_array(properties));
                buf
            }
            AMF0Value::Null => vec![AMF0_TYPE_NULL],
            AMF0Value::Undefined => vec![AMF0_TYPE_UNDEFINED],
        }
    }

    /// Encodes number value (IEEE-754 64 bit, big endian)
    pub fn encode_number(num: f64) -> Vec<u8> {
        let mut buf = vec![0; 8];
        BigEndian::write_f64(&mut buf, num);
        buf
    }

    /// Encodes boolean value
    pub fn encode_bool(b: bool) -> Vec<u8> {
        if b {
            vec![0x01]
        } else {
            vec![0x00]
        }
    }

    /// Encodes string value (2 byte length prefix)
    pub fn encode_string(s: &str) -> Vec<u8> {
        let str_bytes = s.bytes();
        let mut buf = vec![0x00; 2];
        BigEndian::write_u16(&mut buf, str_bytes.len() as u16);
        buf.extend(str_bytes);
        buf
    }

    /// Encodes long string value (4 byte length prefix)
    pub fn encode_long_string(s: &str) -> Vec<u8> {
        let str_bytes = s.bytes();
        let mut buf = vec![0x00; 4];
        BigEndian::write_u32(&mut buf, str_bytes.len() as u32);
        buf.extend(str_bytes);
        buf
    }

    /// Encodes object properties, preserving their order
    pub fn encode_object(properties: &AMF0Properties) -> Vec<u8> {
        let mut buf = Vec::new();

        for (key, value) in properties.iter() {
            buf.extend(Self::encode_string(key));
            buf.extend(value.encode());
        }

        buf.extend(Self::encode_string(""));
        buf.push(AMF0_OBJECT_TERM_CODE);

        buf
    }

    /// Encodes ECMA array value
    pub fn encode_ecma_array(properties: &AMF0Properties) -> Vec<u8> {
        let mut buf = vec![0x00; 4];
        BigEndian::write_u32(&mut buf, properties.len() as u32);
        buf.extend(Self::encode_object(properties));
        buf
    }

    // Decoding functions:

    /// Reads a single value from the cursor
    pub fn read(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<AMF0Value, ()> {
        let type_marker = cursor.read(buffer, 1)?[0];

        match type_marker {
            AMF0_TYPE_NUMBER => {
                let b = cursor.read(buffer, 8)?;
                Ok(AMF0Value::Number {
                    value: BigEndian::read_f64(b),
                })
            }
            AMF0_TYPE_BOOL => {
                let b = cursor.read(buffer, 1)?;
                Ok(AMF0Value::Bool { value: b[0] != 0 })
            }
            AMF0_TYPE_STRING => {
                let value = Self::read_string(cursor, buffer)?;
                Ok(AMF0Value::String { value })
            }
            AMF0_TYPE_LONG_STRING => {
                let value = Self::read_long_string(cursor, buffer)?;
                Ok(AMF0Value::LongString { value })
            }
            AMF0_TYPE_OBJECT => {
                let properties = Self::read_object_properties(cursor, buffer)?;
                Ok(AMF0Value::Object { properties })
            }
            AMF0_TYPE_ECMA_ARRAY => {
                cursor.skip(4)?; // Element count, the terminator is authoritative
                let properties = Self::read_object_properties(cursor, buffer)?;
                Ok(AMF0Value::EcmaArray { properties })
            }
            AMF0_TYPE_NULL => Ok(AMF0Value::Null),
            AMF0_TYPE_UNDEFINED => Ok(AMF0Value::Undefined),
            AMF0_TYPE_DATE => {
                // Not part of the supported subset, skipped
                cursor.skip(10)?;
                Ok(AMF0Value::Undefined)
            }
            _ => Err(()),
        }
    }

    /// Reads a string (2 byte length prefix)
    fn read_string(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<String, ()> {
        let len_bytes = cursor.read(buffer, 2)?;
        let len = BigEndian::read_u16(len_bytes) as usize;
        let str_bytes = cursor.read(buffer, len)?;
        Ok(String::from_utf8_lossy(str_bytes).to_string())
    }

    /// Reads a long string (4 byte length prefix)
    fn read_long_string(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<String, ()> {
        let len_bytes = cursor.read(buffer, 4)?;
        let len = BigEndian::read_u32(len_bytes) as usize;
        let str_bytes = cursor.read(buffer, len)?;
        Ok(String::from_utf8_lossy(str_bytes).to_string())
    }

    /// Reads object properties until the object end marker
    fn read_object_properties(
        cursor: &mut AMFDecodingCursor,
        buffer: &[u8],
    ) -> Result<AMF0Properties, ()> {
        let mut properties: AMF0Properties = Vec::new();

        loop {
            let key = Self::read_string(cursor, buffer)?;

            if key.is_empty() {
                let term = cursor.read(buffer, 1)?;

                if term[0] != AMF0_OBJECT_TERM_CODE {
                    return Err(());
                }

                return Ok(properties);
            }

            let value = Self::read(cursor, buffer)?;

            properties.push((key, value));
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: Vec<AMF0Value>) -> Vec<AMF0Value> {
        let mut buf: Vec<u8> = Vec::new();

        for value in &values {
            buf.extend(value.encode());
        }

        let mut cursor = AMFDecodingCursor::new(&buf);
        let mut decoded: Vec<AMF0Value> = Vec::new();

        while !cursor.ended() {
            decoded.push(AMF0Value::read(&mut cursor, &buf).expect("decode failed"));
        }

        decoded
    }

    #[test]
    fn test_amf0_scalars_round_trip() {
        let values = vec![
            AMF0Value::Number { value: 1935.0 },
            AMF0Value::Number { value: -0.5 },
            AMF0Value::Bool { value: true },
            AMF0Value::Bool { value: false },
            AMF0Value::String {
                value: "onMetaData".to_string(),
            },
            AMF0Value::Null,
            AMF0Value::Undefined,
        ];

        assert_eq!(round_trip(values.clone()), values);
    }

    #[test]
    fn test_amf0_number_encoding_is_big_endian() {
        let encoded = AMF0Value::Number { value: 1.0 }.encode();

        assert_eq!(
            encoded,
            vec![0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_amf0_object_preserves_key_order() {
        let object = AMF0Value::Object {
            properties: vec![
                (
                    "zzz".to_string(),
                    AMF0Value::String {
                        value: "first".to_string(),
                    },
                ),
                ("aaa".to_string(), AMF0Value::Number { value: 2.0 }),
                ("mmm".to_string(), AMF0Value::Bool { value: true }),
            ],
        };

        let decoded = round_trip(vec![object.clone()]);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], object);

        let keys: Vec<&str> = decoded[0]
            .get_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();

        assert_eq!(keys, vec!["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn test_amf0_nested_object_and_ecma_array() {
        let value = AMF0Value::EcmaArray {
            properties: vec![
                ("width".to_string(), AMF0Value::Number { value: 1280.0 }),
                ("height".to_string(), AMF0Value::Number { value: 720.0 }),
                (
                    "encoder".to_string(),
                    AMF0Value::Object {
                        properties: vec![(
                            "name".to_string(),
                            AMF0Value::String {
                                value: "x264".to_string(),
                            },
                        )],
                    },
                ),
            ],
        };

        assert_eq!(round_trip(vec![value.clone()]), vec![value]);
    }

    #[test]
    fn test_amf0_long_string_selected_by_length() {
        let long_value = "a".repeat(70000);
        let encoded = AMF0Value::String {
            value: long_value.clone(),
        }
        .encode();

        // Long string marker with a 4 byte length
        assert_eq!(encoded[0], 0x0C);

        let mut cursor = AMFDecodingCursor::new(&encoded);
        let decoded = AMF0Value::read(&mut cursor, &encoded).unwrap();

        assert_eq!(decoded.get_string(), long_value);
    }

    #[test]
    fn test_amf0_truncated_value_fails() {
        let encoded = AMF0Value::Number { value: 42.0 }.encode();
        let truncated = &encoded[..encoded.len() - 1];

        let mut cursor = AMFDecodingCursor::new(truncated);

        assert!(AMF0Value::read(&mut cursor, truncated).is_err());
    }

    #[test]
    fn test_amf0_unknown_marker_fails() {
        let buf = vec![0x55, 0x00, 0x00];
        let mut cursor = AMFDecodingCursor::new(&buf);

        assert!(AMF0Value::read(&mut cursor, &buf).is_err());
    }
}
