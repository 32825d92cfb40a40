use log::{debug, info};

use crate::{
    error::RecipeError,
    schema::{MarkKind, Recipe, RecipeId, UserId},
    store::Store,
    views::ShortRecipe,
};

async fn existing_recipe<S>(store: &S, id: RecipeId) -> Result<Recipe, RecipeError>
where
    S: Store + ?Sized,
{
    store
        .get_recipe(id)
        .await?
        .ok_or(RecipeError::NotFound { entity: "recipe", id })
}

async fn add_mark<S>(
    store: &S,
    kind: MarkKind,
    user: UserId,
    recipe_id: RecipeId,
) -> Result<ShortRecipe, RecipeError>
where
    S: Store + ?Sized,
{
    let recipe = existing_recipe(store, recipe_id).await?;

    if !store.insert_mark(kind, user, recipe_id).await? {
        debug!("User {user} already has {} for recipe {recipe_id}", kind.entity());
        return Err(RecipeError::Conflict {
            entity: kind.entity(),
            key: recipe.name,
        });
    }
    info!("User {user} added recipe {recipe_id} to {}", kind.table());

    Ok(recipe.into())
}

async fn remove_mark<S>(
    store: &S,
    kind: MarkKind,
    user: UserId,
    recipe_id: RecipeId,
) -> Result<(), RecipeError>
where
    S: Store + ?Sized,
{
    existing_recipe(store, recipe_id).await?;

    if !store.delete_mark(kind, user, recipe_id).await? {
        return Err(RecipeError::NotFound {
            entity: kind.entity(),
            id: recipe_id,
        });
    }
    info!("User {user} removed recipe {recipe_id} from {}", kind.table());

    Ok(())
}

pub async fn add_favorite<S>(store: &S, user: UserId, recipe: RecipeId) -> Result<ShortRecipe, RecipeError>
where
    S: Store + ?Sized,
{
    add_mark(store, MarkKind::Favorite, user, recipe).await
}

pub async fn remove_favorite<S>(store: &S, user: UserId, recipe: RecipeId) -> Result<(), RecipeError>
where
    S: Store + ?Sized,
{
    remove_mark(store, MarkKind::Favorite, user, recipe).await
}

pub async fn add_to_cart<S>(store: &S, user: UserId, recipe: RecipeId) -> Result<ShortRecipe, RecipeError>
where
    S: Store + ?Sized,
{
    add_mark(store, MarkKind::ShoppingCart, user, recipe).await
}

pub async fn remove_from_cart<S>(store: &S, user: UserId, recipe: RecipeId) -> Result<(), RecipeError>
where
    S: Store + ?Sized,
{
    remove_mark(store, MarkKind::ShoppingCart, user, recipe).await
}
