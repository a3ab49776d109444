//! Conversion between stored user documents and domain users.
//!
//! Stored documents use the field names `_id`, `nombre`, `password`, `email`
//! and `age`. Anything else on a document is carried as a free-form attribute
//! after every embedded `ObjectId` has been rendered as its hex string.
//!
//! Decoding is lenient: a stored user needs only an identifier and a
//! non-empty `nombre`. An `email` or `age` of an unexpected shape is kept as a
//! raw attribute rather than rejected.

use bson::{Bson, Document, doc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::codec::stringify_document;
use crate::domain::ports::UserPersistenceError;
use crate::domain::{User, UserDraft, UserId};

const EMAIL: &str = "email";
const AGE: &str = "age";

#[derive(Debug, Deserialize)]
struct UserRow {
    #[serde(rename = "_id")]
    id: String,
    nombre: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    age: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Filter matching a single user by identifier.
pub(super) fn id_filter(id: &UserId) -> Document {
    doc! { "_id": *id.as_object_id() }
}

/// Full document written when inserting a user.
pub(super) fn to_document(user: &User) -> Result<Document, UserPersistenceError> {
    let mut document = doc! { "_id": *user.id().as_object_id() };
    for (key, value) in replacement_document(user.draft()) {
        document.insert(key, value);
    }
    for (key, value) in user.attributes() {
        let encoded = bson::to_bson(value)
            .map_err(|err| UserPersistenceError::query(format!("attribute {key}: {err}")))?;
        document.insert(key.as_str(), encoded);
    }
    Ok(document)
}

/// Document replacing every field of a stored user except `_id`.
///
/// Fields absent from the draft, modelled or not, are dropped by the
/// replacement.
pub(super) fn replacement_document(draft: &UserDraft) -> Document {
    let mut document = doc! { "nombre": draft.name(), "password": draft.password() };
    if let Some(email) = draft.email() {
        document.insert(EMAIL, email);
    }
    if let Some(age) = draft.age() {
        document.insert(AGE, i32::from(age));
    }
    document
}

/// Decode a stored document into a domain user.
///
/// # Errors
///
/// Returns [`UserPersistenceError::Decode`] when the document lacks a valid
/// identifier or a non-empty string `nombre`.
pub(super) fn from_document(document: Document) -> Result<User, UserPersistenceError> {
    let json = Bson::Document(stringify_document(document)).into_relaxed_extjson();
    let UserRow {
        id,
        nombre,
        password,
        email,
        age,
        mut extra,
    } = serde_json::from_value(json).map_err(|err| UserPersistenceError::decode(err.to_string()))?;
    let id = UserId::parse(&id).map_err(|err| UserPersistenceError::decode(err.to_string()))?;
    let email = email.and_then(|value| keep_or_stash(EMAIL, value, decode_email, &mut extra));
    let age = age.and_then(|value| keep_or_stash(AGE, value, decode_age, &mut extra));
    let draft = UserDraft::stored(nombre, password, email, age)
        .map_err(|err| UserPersistenceError::decode(format!("{id}: {err}")))?;
    Ok(User::new(id, draft).with_attributes(extra))
}

/// Decode `value` as a modelled field, or keep it verbatim under `key`.
fn keep_or_stash<T>(
    key: &str,
    value: Value,
    decode: fn(&Value) -> Option<T>,
    extra: &mut Map<String, Value>,
) -> Option<T> {
    if value.is_null() {
        return None;
    }
    let decoded = decode(&value);
    if decoded.is_none() {
        extra.insert(key.to_owned(), value);
    }
    decoded
}

fn decode_email(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|address| address.contains('@'))
        .map(str::to_owned)
}

fn decode_age(value: &Value) -> Option<u16> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_u64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|whole| whole.fract() == 0.0 && *whole >= 0.0)
                .map(|whole| whole as u64)
        })
        .and_then(|whole| u16::try_from(whole).ok())
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use serde_json::json;

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn oid() -> ObjectId {
        ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").expect("valid object id")
    }

    #[rstest]
    fn decodes_minimal_document(oid: ObjectId) {
        let user = from_document(doc! { "_id": oid, "nombre": "Ana", "password": "x" })
            .expect("valid document");

        assert_eq!(user.id().to_string(), "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(user.name(), "Ana");
        assert_eq!(user.email(), None);
        assert!(user.attributes().is_empty());
    }

    #[rstest]
    fn extra_fields_become_attributes_with_string_ids(oid: ObjectId) {
        let referenced = ObjectId::parse_str("0123456789abcdef01234567").expect("valid object id");
        let user = from_document(doc! {
            "_id": oid,
            "nombre": "Ana",
            "password": "x",
            "age": 30.0,
            "perfil": { "creador": referenced, "etiquetas": ["a", "b"] },
        })
        .expect("valid document");

        assert_eq!(user.age(), Some(30));
        assert_eq!(
            Value::Object(user.attributes().clone()),
            json!({ "perfil": { "creador": "0123456789abcdef01234567", "etiquetas": ["a", "b"] } })
        );
    }

    #[rstest]
    #[case(doc! { "nombre": "Ana", "password": "x" })]
    #[case(doc! { "_id": "not-an-id", "nombre": "Ana", "password": "x" })]
    #[case(doc! { "_id": ObjectId::new(), "password": "x" })]
    #[case(doc! { "_id": ObjectId::new(), "nombre": "  ", "password": "x" })]
    #[case(doc! { "_id": ObjectId::new(), "nombre": 7, "password": "x" })]
    fn rejects_documents_without_identifier_or_name(#[case] document: Document) {
        let err = from_document(document).expect_err("invalid document");
        assert!(matches!(err, UserPersistenceError::Decode { .. }));
    }

    #[rstest]
    #[case::empty_password(doc! { "password": "" }, "", json!({}))]
    #[case::missing_password(doc! {}, "", json!({}))]
    #[case::email_without_at(
        doc! { "password": "x", "email": "n/a" },
        "x",
        json!({ "email": "n/a" })
    )]
    #[case::email_not_a_string(
        doc! { "password": "x", "email": 42 },
        "x",
        json!({ "email": 42 })
    )]
    #[case::age_as_text(doc! { "password": "x", "age": "30" }, "x", json!({ "age": "30" }))]
    #[case::negative_age(doc! { "password": "x", "age": -1 }, "x", json!({ "age": -1 }))]
    #[case::fractional_age(doc! { "password": "x", "age": 30.5 }, "x", json!({ "age": 30.5 }))]
    #[case::age_out_of_range(
        doc! { "password": "x", "age": 70_000 },
        "x",
        json!({ "age": 70_000 })
    )]
    fn keeps_loosely_shaped_records(
        oid: ObjectId,
        #[case] fields: Document,
        #[case] password: &str,
        #[case] attributes: Value,
    ) {
        let mut document = doc! { "_id": oid, "nombre": "Ana" };
        for (key, value) in fields {
            document.insert(key, value);
        }

        let user = from_document(document).expect("only _id and nombre are required");

        assert_eq!(user.name(), "Ana");
        assert_eq!(user.password(), password);
        assert_eq!(user.email(), None);
        assert_eq!(user.age(), None);
        assert_eq!(Value::Object(user.attributes().clone()), attributes);
    }

    #[rstest]
    fn null_optional_fields_are_absent(oid: ObjectId) {
        let user = from_document(doc! {
            "_id": oid,
            "nombre": "Ana",
            "password": "x",
            "email": Bson::Null,
            "age": Bson::Null,
        })
        .expect("valid document");

        assert_eq!(user.email(), None);
        assert_eq!(user.age(), None);
        assert!(user.attributes().is_empty());
    }

    #[rstest]
    fn insert_document_round_trips(oid: ObjectId) {
        let draft = UserDraft::new("Ana", "x")
            .and_then(|draft| draft.with_email(Some("ana@example.com".into())))
            .expect("valid draft")
            .with_age(Some(41));
        let user = User::new(UserId::from(oid), draft);

        let document = to_document(&user).expect("encodable");

        assert_eq!(document.get_object_id("_id").ok(), Some(oid));
        assert_eq!(document.get_i32("age").ok(), Some(41));
        assert_eq!(from_document(document).expect("decodable"), user);
    }

    #[rstest]
    fn replacement_holds_only_the_draft_fields() {
        let draft = UserDraft::new("Bea", "y").expect("valid draft").with_age(Some(20));

        assert_eq!(
            replacement_document(&draft),
            doc! { "nombre": "Bea", "password": "y", "age": 20 }
        );
    }

    #[rstest]
    fn replacement_carries_optional_fields_when_present() {
        let draft = UserDraft::new("Bea", "y")
            .and_then(|draft| draft.with_email(Some("bea@example.com".into())))
            .expect("valid draft");

        let document = replacement_document(&draft);

        assert_eq!(document.get_str("email").ok(), Some("bea@example.com"));
        assert!(!document.contains_key("_id"));
        assert!(!document.contains_key("age"));
    }
}
