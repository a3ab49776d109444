//! MongoDB-backed `UserRepository` implementation.
//!
//! Each port method issues exactly one collection call. Deadlines and retries
//! are applied by the domain service around these calls.

use async_trait::async_trait;
use bson::Document;
use futures_util::TryStreamExt;
use mongodb::Collection;
use tracing::warn;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{User, UserDraft, UserId};

use super::client::MongoStore;
use super::documents::{from_document, id_filter, replacement_document, to_document};
use super::error_mapping::map_driver_error;

/// Document-backed user repository over a single collection.
#[derive(Clone, Debug)]
pub struct MongoUserRepository {
    collection: Collection<Document>,
}

impl MongoUserRepository {
    /// Create a repository over the store's users collection.
    pub fn new(store: &MongoStore) -> Self {
        Self {
            collection: store.users(),
        }
    }
}

/// Keep decodable documents, logging and skipping the rest.
fn decode_listing(documents: Vec<Document>) -> Vec<User> {
    documents
        .into_iter()
        .filter_map(|document| match from_document(document) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "skipping stored user that cannot be decoded");
                None
            }
        })
        .collect()
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn list(&self, limit: u32) -> Result<Vec<User>, UserPersistenceError> {
        let cursor = self
            .collection
            .find(Document::new())
            .limit(i64::from(limit))
            .await
            .map_err(|err| map_driver_error("find", &err))?;
        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|err| map_driver_error("find", &err))?;
        Ok(decode_listing(documents))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let document = self
            .collection
            .find_one(id_filter(id))
            .await
            .map_err(|err| map_driver_error("find_one", &err))?;
        document.map(from_document).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let document = to_document(user)?;
        self.collection
            .insert_one(document)
            .await
            .map_err(|err| map_driver_error("insert_one", &err))?;
        Ok(())
    }

    async fn update(&self, id: &UserId, draft: &UserDraft) -> Result<bool, UserPersistenceError> {
        let result = self
            .collection
            .replace_one(id_filter(id), replacement_document(draft))
            .await
            .map_err(|err| map_driver_error("replace_one", &err))?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        let result = self
            .collection
            .delete_one(id_filter(id))
            .await
            .map_err(|err| map_driver_error("delete_one", &err))?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use bson::oid::ObjectId;

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn listing_skips_documents_without_a_name() {
        let valid = ObjectId::new();
        let documents = vec![
            doc! { "_id": valid, "nombre": "Ana", "password": "x" },
            doc! { "_id": ObjectId::new(), "password": "y" },
            doc! { "_id": ObjectId::new(), "nombre": "", "password": "z" },
        ];

        let users = decode_listing(documents);

        assert_eq!(users.len(), 1);
        assert_eq!(users.first().map(|user| *user.id()), Some(UserId::from(valid)));
    }

    #[rstest]
    fn listing_preserves_store_order() {
        let documents = ["Ana", "Bea", "Carla"]
            .into_iter()
            .map(|name| doc! { "_id": ObjectId::new(), "nombre": name, "password": "x" })
            .collect();

        let names: Vec<String> = decode_listing(documents)
            .iter()
            .map(|user| user.name().to_owned())
            .collect();

        assert_eq!(names, ["Ana", "Bea", "Carla"]);
    }
}
