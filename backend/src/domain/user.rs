//! User data model.
//!
//! A [`User`] is a store-assigned [`UserId`] plus the client-supplied
//! [`UserDraft`] fields. Any further attributes found on a stored document are
//! carried through untouched in [`User::attributes`].

use std::fmt;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::codec::{self, InvalidIdentifier};

/// Validation errors returned when building user values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// `nombre` is missing or blank.
    #[error("nombre must not be empty")]
    EmptyName,
    /// `password` is missing or blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// `email` has no `@`.
    #[error("email must contain an @")]
    InvalidEmail,
}

impl UserValidationError {
    /// Wire name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "nombre",
            Self::EmptyPassword => "password",
            Self::InvalidEmail => "email",
        }
    }

    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::EmptyPassword => "empty_password",
            Self::InvalidEmail => "invalid_email",
        }
    }
}

/// Store-native user identifier.
///
/// Serialises as its 24-character hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(ObjectId);

impl UserId {
    /// Decode an identifier from its wire form.
    ///
    /// # Examples
    /// ```
    /// use users_backend::domain::UserId;
    ///
    /// let id = UserId::parse("64b7f0c2a1b2c3d4e5f60718").expect("valid id");
    /// assert_eq!(id.to_string(), "64b7f0c2a1b2c3d4e5f60718");
    /// assert!(UserId::parse("not-an-id").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, InvalidIdentifier> {
        codec::decode(input).map(Self)
    }

    /// Mint a fresh identifier.
    ///
    /// `ObjectId` combines a timestamp, a per-process random value and a
    /// counter, so identifiers minted by independent replicas do not collide.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Access the native identifier.
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }
}

impl From<ObjectId> for UserId {
    fn from(value: ObjectId) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode(&self.0))
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Client-supplied user fields, validated.
///
/// ## Invariants
/// - `name` is non-empty once trimmed.
/// - Drafts built from request data also have a non-empty `password` and an
///   `email`, when present, containing an `@`. Drafts rebuilt from stored
///   records keep those two fields as found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    name: String,
    password: String,
    email: Option<String>,
    age: Option<u16>,
}

impl UserDraft {
    /// Validate and construct a draft from its required fields.
    ///
    /// # Examples
    /// ```
    /// use users_backend::domain::UserDraft;
    ///
    /// let draft = UserDraft::new("Ana", "x").expect("valid draft");
    /// assert_eq!(draft.name(), "Ana");
    /// assert!(UserDraft::new("  ", "x").is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let name = name.into();
        let password = password.into();
        if name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if password.trim().is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }
        Ok(Self {
            name,
            password,
            email: None,
            age: None,
        })
    }

    /// Rebuild the fields of a stored record, checking only the name.
    pub(crate) fn stored(
        name: String,
        password: String,
        email: Option<String>,
        age: Option<u16>,
    ) -> Result<Self, UserValidationError> {
        if name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        Ok(Self {
            name,
            password,
            email,
            age,
        })
    }

    /// Attach an optional email address.
    pub fn with_email(mut self, email: Option<String>) -> Result<Self, UserValidationError> {
        if let Some(address) = email.as_deref() {
            if !address.contains('@') {
                return Err(UserValidationError::InvalidEmail);
            }
        }
        self.email = email;
        Ok(self)
    }

    /// Attach an optional age.
    pub fn with_age(mut self, age: Option<u16>) -> Self {
        self.age = age;
        self
    }

    /// Display name, stored as `nombre`.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Password exactly as supplied.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Optional email address.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Optional age in years.
    pub fn age(&self) -> Option<u16> {
        self.age
    }
}

/// A stored user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    draft: UserDraft,
    attributes: Map<String, Value>,
}

impl User {
    /// Pair an identifier with its fields.
    pub fn new(id: UserId, draft: UserDraft) -> Self {
        Self {
            id,
            draft,
            attributes: Map::new(),
        }
    }

    /// Attach attributes found on the stored document beyond the modelled
    /// fields.
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Store-assigned identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// The modelled fields.
    pub fn draft(&self) -> &UserDraft {
        &self.draft
    }

    /// Unmodelled attributes, with identifiers already rendered as strings.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Shorthand for [`UserDraft::name`].
    pub fn name(&self) -> &str {
        self.draft.name()
    }

    /// Shorthand for [`UserDraft::password`].
    pub fn password(&self) -> &str {
        self.draft.password()
    }

    /// Shorthand for [`UserDraft::email`].
    pub fn email(&self) -> Option<&str> {
        self.draft.email()
    }

    /// Shorthand for [`UserDraft::age`].
    pub fn age(&self) -> Option<u16> {
        self.draft.age()
    }
}
