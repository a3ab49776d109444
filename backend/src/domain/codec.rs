//! Conversion between the store's native identifiers and their wire form.
//!
//! MongoDB identifies documents with 12-byte `ObjectId` values. At the HTTP
//! boundary they travel as 24-character lowercase hex strings. Query results
//! may nest identifiers inside sub-documents or arrays, so
//! [`stringify_identifiers`] walks a whole value and rewrites every embedded
//! identifier.

use bson::oid::ObjectId;
use bson::{Bson, Document};

/// Returned when a string is not a valid identifier encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {input:?} is not a 24 character hex string")]
pub struct InvalidIdentifier {
    input: String,
}

impl InvalidIdentifier {
    /// The rejected input.
    pub fn input(&self) -> &str {
        self.input.as_str()
    }
}

/// Render a native identifier as its hex string.
///
/// # Examples
/// ```
/// use bson::oid::ObjectId;
/// use users_backend::domain::codec::{decode, encode};
///
/// let id = ObjectId::new();
/// assert_eq!(decode(&encode(&id)), Ok(id));
/// ```
pub fn encode(id: &ObjectId) -> String {
    id.to_hex()
}

/// Parse a hex string into a native identifier.
pub fn decode(input: &str) -> Result<ObjectId, InvalidIdentifier> {
    ObjectId::parse_str(input).map_err(|_| InvalidIdentifier {
        input: input.to_owned(),
    })
}

/// Replace every embedded `ObjectId` in `value` with its hex string.
///
/// Recurses into document values and array elements; keys and all other
/// scalars are left untouched, so applying it twice changes nothing.
///
/// # Examples
/// ```
/// use bson::{bson, oid::ObjectId};
/// use users_backend::domain::codec::stringify_identifiers;
///
/// let id = ObjectId::new();
/// let value = bson!({ "owner": { "refs": [id] } });
/// let expected = bson!({ "owner": { "refs": [id.to_hex()] } });
/// assert_eq!(stringify_identifiers(value), expected);
/// ```
pub fn stringify_identifiers(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(id) => Bson::String(encode(&id)),
        Bson::Document(document) => Bson::Document(stringify_document(document)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(stringify_identifiers).collect()),
        other => other,
    }
}

/// Document-level form of [`stringify_identifiers`].
pub fn stringify_document(document: Document) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, stringify_identifiers(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{bson, doc};
    use rstest::rstest;

    const HEX: &str = "64b7f0c2a1b2c3d4e5f60718";

    fn fixed_id() -> ObjectId {
        ObjectId::parse_str(HEX).expect("fixture id is valid hex")
    }

    #[rstest]
    fn encode_renders_lowercase_hex() {
        assert_eq!(encode(&fixed_id()), HEX);
    }

    #[rstest]
    #[case::empty("")]
    #[case::too_short("64b7f0c2")]
    #[case::too_long("64b7f0c2a1b2c3d4e5f6071800")]
    #[case::not_hex("zzzzzzzzzzzzzzzzzzzzzzzz")]
    #[case::padded(" 64b7f0c2a1b2c3d4e5f60718")]
    fn decode_rejects_malformed_input(#[case] input: &str) {
        let err = decode(input).expect_err("malformed identifiers must fail");
        assert_eq!(err.input(), input);
    }

    #[rstest]
    fn decode_accepts_uppercase_hex() {
        let id = decode(&HEX.to_uppercase()).expect("uppercase hex parses");
        assert_eq!(id, fixed_id());
    }

    #[rstest]
    fn stringify_rewrites_nested_identifiers_only() {
        let id = fixed_id();
        let input = doc! {
            "_id": id,
            "nombre": "Ana",
            "age": 31_i32,
            "profile": { "friend": id, "tags": ["a", 1_i32] },
            "history": [ { "by": id }, [id], Bson::Null ],
        };
        let expected = doc! {
            "_id": HEX,
            "nombre": "Ana",
            "age": 31_i32,
            "profile": { "friend": HEX, "tags": ["a", 1_i32] },
            "history": [ { "by": HEX }, [HEX], Bson::Null ],
        };

        assert_eq!(stringify_document(input), expected);
    }

    #[rstest]
    fn stringify_is_idempotent() {
        let value = bson!({ "refs": [fixed_id()], "n": 2.5 });
        let once = stringify_identifiers(value);
        let twice = stringify_identifiers(once.clone());
        assert_eq!(once, twice);
    }

    #[rstest]
    fn stringify_preserves_key_order() {
        let input = doc! { "z": fixed_id(), "a": 1_i32, "m": "x" };
        let keys: Vec<_> = stringify_document(input).keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
