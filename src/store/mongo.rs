use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::{debug, info};

use super::{MovieFilter, MovieStore, SortOrder, StoreError, UpdateCounts};

#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects and pings; an unreachable server is an error here rather
    /// than on the first request.
    pub async fn connect(
        url: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB database '{}'", database);
        let mut options = ClientOptions::parse(url).await?;
        options.app_name = Some(format!("filmshelf/{}", env!("CARGO_PKG_VERSION")));
        options.connect_timeout = Some(Duration::from_secs(5));
        options.server_selection_timeout = Some(Duration::from_secs(5));
        let client = Client::with_options(options)?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }, None).await?;
        let collection = db.collection::<Document>(collection);
        let count = collection.count_documents(doc! {}, None).await?;
        info!(
            "Connected to MongoDB, {} documents in collection '{}'",
            count,
            collection.name()
        );

        Ok(Self { client, collection })
    }
}

#[async_trait]
impl MovieStore for MongoStore {
    async fn insert(&self, document: Document) -> Result<ObjectId, StoreError> {
        let result = self.collection.insert_one(document, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or(StoreError::UnexpectedKey)
    }

    async fn find(
        &self,
        filter: &MovieFilter,
        sort: SortOrder,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = filter.to_document();
        debug!(filter = %filter, ?sort, "Querying collection");
        let options = FindOptions::builder().sort(sort.to_document()).build();
        let cursor = self.collection.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": *id }, None).await?)
    }

    async fn set_fields(
        &self,
        id: &ObjectId,
        fields: Document,
    ) -> Result<UpdateCounts, StoreError> {
        let result = self
            .collection
            .update_one(doc! { "_id": *id }, doc! { "$set": fields }, None)
            .await?;
        Ok(UpdateCounts {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete(&self, id: &ObjectId) -> Result<u64, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": *id }, None).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB connection closed");
    }
}
