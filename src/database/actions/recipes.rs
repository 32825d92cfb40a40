use std::collections::HashMap;

use log::{debug, info};

use crate::{
    error::{RecipeError, StoreError},
    pagination::{Page, PageRequest},
    payload::RecipePayload,
    schema::{IngredientId, RecipeId, UserId},
    session::Viewer,
    store::{PartRecord, RecipeRecord, Store},
    validation::{validate_recipe, ValidRecipe},
    views::{recipe_view, RecipeFilter, RecipeView},
};

fn write_error(e: StoreError, name: &str) -> RecipeError {
    if e.is_unique_violation() {
        RecipeError::Conflict {
            entity: "recipe",
            key: name.to_string(),
        }
    } else {
        RecipeError::Internal(e)
    }
}

/// Builds the write set with ingredient rows ordered by name, then unit, then id.
async fn build_record<S>(store: &S, valid: ValidRecipe) -> Result<RecipeRecord, RecipeError>
where
    S: Store + ?Sized,
{
    let ids: Vec<IngredientId> = valid.ingredients().iter().map(|entry| entry.id).collect();
    let ingredients: HashMap<IngredientId, _> = store
        .get_ingredients(&ids)
        .await?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();

    let mut parts = Vec::with_capacity(valid.ingredients().len());
    for entry in valid.ingredients() {
        let ingredient = ingredients.get(&entry.id).ok_or(RecipeError::NotFound {
            entity: "ingredient",
            id: entry.id,
        })?;
        parts.push((ingredient, entry.amount));
    }
    parts.sort_by(|(a, _), (b, _)| {
        (&a.name, &a.measurement_unit, a.id).cmp(&(&b.name, &b.measurement_unit, b.id))
    });

    Ok(RecipeRecord {
        author_id: valid.author(),
        name: valid.name().to_string(),
        text: valid.text().to_string(),
        image: valid.image().map(|image| image.to_string()),
        cooking_time: valid.cooking_time(),
        parts: parts
            .into_iter()
            .map(|(ingredient, amount)| PartRecord {
                ingredient_id: ingredient.id,
                amount,
            })
            .collect(),
        tags: valid.tags().to_vec(),
    })
}

/// The viewer's id, provided they wrote recipe `id`.
async fn check_owner<S>(store: &S, viewer: Viewer, id: RecipeId) -> Result<UserId, RecipeError>
where
    S: Store + ?Sized,
{
    let user = viewer.require_user()?;
    let recipe = store
        .get_recipe(id)
        .await?
        .ok_or(RecipeError::NotFound { entity: "recipe", id })?;

    if recipe.author_id != user {
        debug!("User {user} tried to modify recipe {id} of user {}", recipe.author_id);
        return Err(RecipeError::PermissionDenied(
            "Only the author may modify this recipe",
        ));
    }

    Ok(user)
}

pub async fn create_recipe<S>(
    store: &S,
    author: UserId,
    payload: RecipePayload,
) -> Result<RecipeView, RecipeError>
where
    S: Store + ?Sized,
{
    let valid = validate_recipe(store, author, payload, None)
        .await
        .map_err(|e| {
            debug!("Rejected recipe of user {author}: {e}");
            e
        })?;
    let record = build_record(store, valid).await?;

    let recipe = store
        .insert_recipe(&record)
        .await
        .map_err(|e| write_error(e, &record.name))?;
    info!("User {author} created recipe {} '{}'", recipe.id, recipe.name);

    recipe_view(store, Viewer::User(author), recipe).await
}

/// Overwrites every field and every ingredient and tag row of the recipe.
pub async fn replace_recipe<S>(
    store: &S,
    viewer: Viewer,
    id: RecipeId,
    payload: RecipePayload,
) -> Result<RecipeView, RecipeError>
where
    S: Store + ?Sized,
{
    let user = check_owner(store, viewer, id).await?;

    let valid = validate_recipe(store, user, payload, Some(id))
        .await
        .map_err(|e| {
            debug!("Rejected update of recipe {id}: {e}");
            e
        })?;
    let record = build_record(store, valid).await?;

    let recipe = store
        .replace_recipe(id, &record)
        .await
        .map_err(|e| write_error(e, &record.name))?
        .ok_or(RecipeError::NotFound { entity: "recipe", id })?;
    info!("User {user} replaced recipe {id}");

    recipe_view(store, viewer, recipe).await
}

pub async fn delete_recipe<S>(store: &S, viewer: Viewer, id: RecipeId) -> Result<(), RecipeError>
where
    S: Store + ?Sized,
{
    let user = check_owner(store, viewer, id).await?;

    if !store.delete_recipe(id).await? {
        return Err(RecipeError::NotFound { entity: "recipe", id });
    }
    info!("User {user} deleted recipe {id}");

    Ok(())
}

pub async fn get_recipe<S>(store: &S, viewer: Viewer, id: RecipeId) -> Result<RecipeView, RecipeError>
where
    S: Store + ?Sized,
{
    let recipe = store
        .get_recipe(id)
        .await?
        .ok_or(RecipeError::NotFound { entity: "recipe", id })?;

    recipe_view(store, viewer, recipe).await
}

pub async fn list_recipes<S>(
    store: &S,
    viewer: Viewer,
    filter: &RecipeFilter,
    page: &PageRequest,
) -> Result<Page<RecipeView>, RecipeError>
where
    S: Store + ?Sized,
{
    let (recipes, count) = store.fetch_recipes(&filter.resolve(viewer), page).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(recipe_view(store, viewer, recipe).await?);
    }

    Ok(Page::from_rows(results, count, page))
}
