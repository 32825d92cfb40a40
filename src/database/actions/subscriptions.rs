use log::{debug, info};

use crate::{
    error::RecipeError,
    pagination::{Page, PageRequest},
    schema::{User, UserId},
    session::Viewer,
    store::Store,
    views::{subscription_view, SubscriptionView},
};

async fn existing_user<S>(store: &S, id: UserId) -> Result<User, RecipeError>
where
    S: Store + ?Sized,
{
    store
        .get_user(id)
        .await?
        .ok_or(RecipeError::NotFound { entity: "user", id })
}

/// Follows `author`. Subscribing to oneself is rejected before anything is looked up.
pub async fn subscribe<S>(
    store: &S,
    subscriber: UserId,
    author: UserId,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, RecipeError>
where
    S: Store + ?Sized,
{
    if subscriber == author {
        debug!("User {subscriber} tried to subscribe to themselves");
        return Err(RecipeError::InvalidOperation(
            "You cannot subscribe to yourself",
        ));
    }
    let author = existing_user(store, author).await?;

    if !store.insert_subscription(subscriber, author.id).await? {
        return Err(RecipeError::Conflict {
            entity: "subscription",
            key: author.username,
        });
    }
    info!("User {subscriber} subscribed to user {}", author.id);

    subscription_view(store, Viewer::User(subscriber), author, recipes_limit).await
}

pub async fn unsubscribe<S>(store: &S, subscriber: UserId, author: UserId) -> Result<(), RecipeError>
where
    S: Store + ?Sized,
{
    let author = existing_user(store, author).await?;

    if !store.delete_subscription(subscriber, author.id).await? {
        return Err(RecipeError::NotFound {
            entity: "subscription",
            id: author.id,
        });
    }
    info!("User {subscriber} unsubscribed from user {}", author.id);

    Ok(())
}

pub async fn list_subscriptions<S>(
    store: &S,
    subscriber: UserId,
    page: &PageRequest,
    recipes_limit: Option<i64>,
) -> Result<Page<SubscriptionView>, RecipeError>
where
    S: Store + ?Sized,
{
    let (authors, count) = store.fetch_subscriptions(subscriber, page).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(subscription_view(store, Viewer::User(subscriber), author, recipes_limit).await?);
    }

    Ok(Page::from_rows(results, count, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PartRecord, RecipeRecord, RecipeRepository};

    async fn publish(store: &MemoryStore, author: UserId, name: &str) {
        let salt = store.add_ingredient(&format!("Salt for {name}"), "g").await.unwrap();
        let tag = store
            .add_tag(name, &format!("#{name}"), &name.to_lowercase())
            .await
            .unwrap();
        store
            .insert_recipe(&RecipeRecord {
                author_id: author,
                name: name.to_string(),
                text: "Cook it.".to_string(),
                image: None,
                cooking_time: 5,
                parts: vec![PartRecord {
                    ingredient_id: salt.id,
                    amount: 1,
                }],
                tags: vec![tag.id],
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn self_subscription_is_checked_first() {
        let store = MemoryStore::new();

        // No such user exists, yet the self check wins.
        let error = subscribe(&store, 42, 42, None).await.unwrap_err();
        assert!(matches!(error, RecipeError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn subscription_toggle_follows_presence() {
        let store = MemoryStore::new();
        let reader = store.add_user("reader").await.unwrap().id;
        let chef = store.add_user("chef").await.unwrap().id;

        let view = subscribe(&store, reader, chef, None).await.unwrap();
        assert!(view.author.is_subscribed);

        let error = subscribe(&store, reader, chef, None).await.unwrap_err();
        assert!(matches!(error, RecipeError::Conflict { entity: "subscription", .. }));

        unsubscribe(&store, reader, chef).await.unwrap();
        assert!(unsubscribe(&store, reader, chef).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn recipes_limit_truncates_but_count_is_full() {
        let store = MemoryStore::new();
        let reader = store.add_user("reader").await.unwrap().id;
        let chef = store.add_user("chef").await.unwrap().id;
        publish(&store, chef, "Soup").await;
        publish(&store, chef, "Salad").await;
        publish(&store, chef, "Pie").await;
        subscribe(&store, reader, chef, None).await.unwrap();

        let page = list_subscriptions(&store, reader, &PageRequest::default(), Some(2))
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].recipes.len(), 2);
        assert_eq!(page.results[0].recipes_count, 3);
        assert_eq!(page.results[0].recipes[0].name, "Pie");
    }

    #[tokio::test]
    async fn unknown_author_is_not_found() {
        let store = MemoryStore::new();
        let reader = store.add_user("reader").await.unwrap().id;

        let error = subscribe(&store, reader, 99, None).await.unwrap_err();
        assert!(matches!(error, RecipeError::NotFound { entity: "user", id: 99 }));
    }
}
