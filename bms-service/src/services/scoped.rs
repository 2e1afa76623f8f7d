//! Organization-scoped collection access shared by the repositories.
//!
//! Every lookup by id carries the caller's organization in the filter, so a
//! record from another organization reads exactly like a missing one.

use super::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::FindOptions,
    Collection,
};
use serde::{de::DeserializeOwned, Serialize};

pub fn is_valid_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

pub fn id_filter(id: &str, org_id: Option<&str>) -> Document {
    let mut filter = doc! { "_id": id };
    if let Some(org) = org_id {
        filter.insert("organizationId", org);
    }
    filter
}

pub fn bson_date(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(dt)
}

/// `{ $gte: from, $lte: to }` for whichever bounds are present.
pub fn date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Document> {
    let mut range = Document::new();
    if let Some(from) = from {
        range.insert("$gte", bson_date(from));
    }
    if let Some(to) = to {
        range.insert("$lte", bson_date(to));
    }
    (!range.is_empty()).then_some(range)
}

/// Case-insensitive substring match on user input.
pub fn contains_ci(term: &str) -> Document {
    let escaped: String = term
        .trim()
        .chars()
        .flat_map(|c| {
            let special = "\\.+*?()|[]{}^$#&-~".contains(c);
            special.then_some('\\').into_iter().chain(std::iter::once(c))
        })
        .collect();
    doc! { "$regex": escaped, "$options": "i" }
}

pub fn to_bson<T: Serialize>(value: &T) -> ServiceResult<Bson> {
    Ok(bson::to_bson(value)?)
}

/// `None` when the id is malformed, absent, or owned by another organization.
pub async fn find_in_org<T>(
    collection: &Collection<T>,
    id: &str,
    org_id: Option<&str>,
) -> ServiceResult<Option<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    if !is_valid_id(id) {
        return Ok(None);
    }
    Ok(collection.find_one(id_filter(id, org_id), None).await?)
}

pub async fn require_in_org<T>(
    collection: &Collection<T>,
    id: &str,
    org_id: &str,
    entity: &str,
) -> ServiceResult<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    find_in_org(collection, id, Some(org_id))
        .await?
        .ok_or_else(|| ServiceError::not_found(entity))
}

/// Resolve a cross-reference; a dangling one is a client error, not a 404.
pub async fn reference_in_org<T>(
    collection: &Collection<T>,
    id: &str,
    org_id: &str,
    entity: &str,
) -> ServiceResult<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    find_in_org(collection, id, Some(org_id))
        .await?
        .ok_or_else(|| ServiceError::InvalidReference(format!("{} not found", entity)))
}

pub async fn find_many<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
) -> ServiceResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(sort).build();
    let cursor = collection.find(filter, options).await?;
    Ok(cursor.try_collect().await?)
}

pub async fn insert<T>(collection: &Collection<T>, value: &T, entity: &str) -> ServiceResult<()>
where
    T: Serialize,
{
    collection
        .insert_one(value, None)
        .await
        .map_err(|e| ServiceError::from_write(e, entity))?;
    Ok(())
}

pub async fn replace_in_org<T>(
    collection: &Collection<T>,
    id: &str,
    org_id: &str,
    value: &T,
    entity: &str,
) -> ServiceResult<()>
where
    T: Serialize,
{
    let result = collection
        .replace_one(id_filter(id, Some(org_id)), value, None)
        .await
        .map_err(|e| ServiceError::from_write(e, entity))?;
    if result.matched_count == 0 {
        return Err(ServiceError::not_found(entity));
    }
    Ok(())
}

pub async fn delete_in_org<T>(
    collection: &Collection<T>,
    id: &str,
    org_id: &str,
    entity: &str,
) -> ServiceResult<()> {
    let result = collection
        .delete_one(id_filter(id, Some(org_id)), None)
        .await?;
    if result.deleted_count == 0 {
        return Err(ServiceError::not_found(entity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_rejected_before_querying() {
        assert!(!is_valid_id("not-a-uuid"));
        assert!(is_valid_id(&uuid::Uuid::new_v4().to_string()));
    }

    #[test]
    fn id_filter_scopes_to_org() {
        let f = id_filter("abc", Some("org-1"));
        assert_eq!(f.get_str("organizationId").unwrap(), "org-1");
        assert!(id_filter("abc", None).get("organizationId").is_none());
    }

    #[test]
    fn search_terms_are_escaped() {
        let d = contains_ci(" a.b* ");
        assert_eq!(d.get_str("$regex").unwrap(), "a\\.b\\*");
    }

    #[test]
    fn date_range_only_includes_given_bounds() {
        assert!(date_range(None, None).is_none());
        let r = date_range(Some(Utc::now()), None).unwrap();
        assert!(r.contains_key("$gte"));
        assert!(!r.contains_key("$lte"));
    }
}
