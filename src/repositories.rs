use crate::{
    domain::{ContactRepository, DonationRepository, PostRepository},
    errors::RepoError,
    models::{Contact, CurrencyTotal, Donation, DonationStatus, Post},
};
use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection, Database,
};
use tracing::info;

pub const DONATIONS_COLLECTION: &str = "donations";
pub const CONTACTS_COLLECTION: &str = "contacts";
pub const POSTS_COLLECTION: &str = "posts";

const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_err)) if write_err.code == DUPLICATE_KEY_CODE
    )
}

fn newest_first(field: &str) -> FindOptions {
    FindOptions::builder().sort(doc! { field: -1 }).build()
}

#[derive(Debug, Clone)]
pub struct MongoDonationRepository {
    collection: Collection<Donation>,
}

impl MongoDonationRepository {
    pub fn new(database: &Database) -> Self {
        info!(collection = DONATIONS_COLLECTION, "Initializing MongoDonationRepository");
        Self {
            collection: database.collection(DONATIONS_COLLECTION),
        }
    }

    async fn set_status(
        &self,
        filter: mongodb::bson::Document,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(
                filter,
                doc! { "$set": { "status": status.as_str() } },
                options,
            )
            .await
            .context("MongoDB: Failed to update donation status")
            .map_err(RepoError::Backend)
    }
}

#[async_trait]
impl DonationRepository for MongoDonationRepository {
    async fn create(&self, donation: &Donation) -> Result<(), RepoError> {
        self.collection
            .insert_one(donation, None)
            .await
            .context("MongoDB: Failed to insert donation")
            .map_err(RepoError::Backend)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Donation>, RepoError> {
        let cursor = self
            .collection
            .find(doc! {}, newest_first("createdAt"))
            .await
            .context("MongoDB: Failed to query donations")
            .map_err(RepoError::Backend)?;
        cursor
            .try_collect()
            .await
            .context("MongoDB: Failed to read donations cursor")
            .map_err(RepoError::Backend)
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError> {
        self.set_status(doc! { "stripePaymentIntentId": payment_intent_id }, status)
            .await
    }

    async fn set_status_by_checkout_request(
        &self,
        checkout_request_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError> {
        self.set_status(doc! { "mpesaCheckoutRequestID": checkout_request_id }, status)
            .await
    }

    /// Sums succeeded donations per currency. Amounts are stored as decimal
    /// strings, so the pipeline converts before summing.
    async fn totals_by_currency(&self) -> Result<Vec<CurrencyTotal>, RepoError> {
        let pipeline = vec![
            doc! { "$match": { "status": DonationStatus::Succeeded.as_str() } },
            doc! { "$group": {
                "_id": "$currency",
                "total": { "$sum": { "$toDouble": "$amount" } },
            }},
        ];

        let mut cursor = self
            .collection
            .aggregate(pipeline, None)
            .await
            .context("MongoDB: Failed to aggregate donation totals")
            .map_err(RepoError::Backend)?;

        let mut totals = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .context("MongoDB: Failed to read aggregation cursor")
            .map_err(RepoError::Backend)?
        {
            let total: CurrencyTotal = from_document(document)
                .context("MongoDB: Malformed aggregation row")
                .map_err(RepoError::Backend)?;
            totals.push(total);
        }
        Ok(totals)
    }
}

#[derive(Debug, Clone)]
pub struct MongoContactRepository {
    collection: Collection<Contact>,
}

impl MongoContactRepository {
    pub fn new(database: &Database) -> Self {
        info!(collection = CONTACTS_COLLECTION, "Initializing MongoContactRepository");
        Self {
            collection: database.collection(CONTACTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ContactRepository for MongoContactRepository {
    async fn create(&self, contact: &Contact) -> Result<(), RepoError> {
        self.collection
            .insert_one(contact, None)
            .await
            .context("MongoDB: Failed to insert contact")
            .map_err(RepoError::Backend)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Contact>, RepoError> {
        let cursor = self
            .collection
            .find(doc! {}, newest_first("submittedAt"))
            .await
            .context("MongoDB: Failed to query contacts")
            .map_err(RepoError::Backend)?;
        cursor
            .try_collect()
            .await
            .context("MongoDB: Failed to read contacts cursor")
            .map_err(RepoError::Backend)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        self.collection
            .count_documents(None, None)
            .await
            .context("MongoDB: Failed to count contacts")
            .map_err(RepoError::Backend)
    }
}

#[derive(Debug, Clone)]
pub struct MongoPostRepository {
    collection: Collection<Post>,
}

impl MongoPostRepository {
    pub fn new(database: &Database) -> Self {
        info!(collection = POSTS_COLLECTION, "Initializing MongoPostRepository");
        Self {
            collection: database.collection(POSTS_COLLECTION),
        }
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    /// Inserts a post. The unique index on `slug` turns a duplicate title
    /// into `RepoError::DuplicateSlug`.
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        match self.collection.insert_one(post, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(RepoError::DuplicateSlug(post.slug.clone()))
            }
            Err(err) => Err(RepoError::Backend(
                anyhow::Error::new(err).context("MongoDB: Failed to insert post"),
            )),
        }
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let cursor = self
            .collection
            .find(doc! {}, newest_first("createdAt"))
            .await
            .context("MongoDB: Failed to query posts")
            .map_err(RepoError::Backend)?;
        cursor
            .try_collect()
            .await
            .context("MongoDB: Failed to read posts cursor")
            .map_err(RepoError::Backend)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        self.collection
            .find_one(doc! { "slug": slug }, None)
            .await
            .context("MongoDB: Failed to query post by slug")
            .map_err(RepoError::Backend)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        self.collection
            .count_documents(None, None)
            .await
            .context("MongoDB: Failed to count posts")
            .map_err(RepoError::Backend)
    }
}
