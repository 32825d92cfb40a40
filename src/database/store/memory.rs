use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    CartRepository, MarkRepository, RecipeQuery, RecipeRecord, RecipeRepository,
    ReferenceLookup, SubscriptionRepository,
};
use crate::{
    error::StoreError,
    pagination::PageRequest,
    schema::{
        CartPart, Id, Ingredient, IngredientId, MarkKind, Recipe, RecipeId, RecipePart, Tag,
        TagId, User, UserId,
    },
};

#[derive(Clone, Debug)]
struct JunctionRow {
    recipe_id: RecipeId,
    ingredient_id: IngredientId,
    amount: i32,
}

#[derive(Clone, Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tags: BTreeMap<TagId, Tag>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    recipes: BTreeMap<RecipeId, Recipe>,
    recipe_ingredients: Vec<JunctionRow>,
    recipe_tags: Vec<(RecipeId, TagId)>,
    favorites: BTreeSet<(UserId, RecipeId)>,
    shopping_cart: BTreeSet<(UserId, RecipeId)>,
    subscriptions: BTreeSet<(UserId, UserId)>,
    last_id: Id,
    write_budget: Option<usize>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    /// Each inserted row spends one unit of the injected budget.
    fn charge_write(&mut self) -> Result<(), StoreError> {
        match self.write_budget {
            Some(0) => Err(StoreError::new("Injected write failure".to_string())),
            Some(n) => {
                self.write_budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn marks(&self, kind: MarkKind) -> &BTreeSet<(UserId, RecipeId)> {
        match kind {
            MarkKind::Favorite => &self.favorites,
            MarkKind::ShoppingCart => &self.shopping_cart,
        }
    }

    fn marks_mut(&mut self, kind: MarkKind) -> &mut BTreeSet<(UserId, RecipeId)> {
        match kind {
            MarkKind::Favorite => &mut self.favorites,
            MarkKind::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn name_taken(&self, author: UserId, name: &str, except: Option<RecipeId>) -> bool {
        self.recipes
            .values()
            .any(|r| r.author_id == author && r.name == name && Some(r.id) != except)
    }

    fn insert_links(&mut self, recipe_id: RecipeId, record: &RecipeRecord) -> Result<(), StoreError> {
        for part in &record.parts {
            self.charge_write()?;
            if self
                .recipe_ingredients
                .iter()
                .any(|r| r.recipe_id == recipe_id && r.ingredient_id == part.ingredient_id)
            {
                return Err(StoreError::unique_violation(
                    "unique_recipe_ingredient".to_string(),
                ));
            }
            self.recipe_ingredients.push(JunctionRow {
                recipe_id,
                ingredient_id: part.ingredient_id,
                amount: part.amount,
            });
        }

        for tag_id in &record.tags {
            self.charge_write()?;
            if self.recipe_tags.contains(&(recipe_id, *tag_id)) {
                return Err(StoreError::unique_violation("recipe_tags_pkey".to_string()));
            }
            self.recipe_tags.push((recipe_id, *tag_id));
        }

        Ok(())
    }

    fn newest_first(&self, mut recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        recipes
    }
}

/// In-process store with the same transactional guarantees as [`super::PgStore`].
///
/// Writes run against a copy of the tables which replaces the live copy only
/// when the whole operation succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Tables) -> Result<T, StoreError>,
    {
        let mut tables = self.tables.lock().await;
        let mut work = tables.clone();

        match f(&mut work) {
            Ok(value) => {
                *tables = work;
                Ok(value)
            }
            Err(e) => {
                log::debug!("Rolled back memory transaction: {e}");
                tables.write_budget = None;
                Err(e)
            }
        }
    }

    /// Makes the next write transaction fail after `rows` inserted rows.
    pub async fn fail_writes_after(&self, rows: usize) {
        self.tables.lock().await.write_budget = Some(rows);
    }

    pub async fn add_user(&self, username: &str) -> Result<User, StoreError> {
        self.transaction(|tables| {
            if tables.users.values().any(|u| u.username == username) {
                return Err(StoreError::unique_violation(format!(
                    "username {username} is taken"
                )));
            }
            let user = User {
                id: tables.next_id(),
                email: format!("{username}@example.com"),
                username: username.to_string(),
                first_name: username.to_string(),
                last_name: String::new(),
            };
            tables.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    pub async fn add_tag(&self, name: &str, color: &str, slug: &str) -> Result<Tag, StoreError> {
        self.transaction(|tables| {
            if tables
                .tags
                .values()
                .any(|t| t.name == name || t.color == color || t.slug == slug)
            {
                return Err(StoreError::unique_violation(format!("tag {name} exists")));
            }
            let tag = Tag {
                id: tables.next_id(),
                name: name.to_string(),
                color: color.to_string(),
                slug: slug.to_string(),
            };
            tables.tags.insert(tag.id, tag.clone());
            Ok(tag)
        })
        .await
    }

    pub async fn add_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, StoreError> {
        self.transaction(|tables| {
            if tables
                .ingredients
                .values()
                .any(|i| i.name == name && i.measurement_unit == measurement_unit)
            {
                return Err(StoreError::unique_violation("unique_ingredient".to_string()));
            }
            let ingredient = Ingredient {
                id: tables.next_id(),
                name: name.to_string(),
                measurement_unit: measurement_unit.to_string(),
            };
            tables.ingredients.insert(ingredient.id, ingredient.clone());
            Ok(ingredient)
        })
        .await
    }
}

#[async_trait]
impl ReferenceLookup for MemoryStore {
    async fn ingredient_exists(&self, id: IngredientId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.ingredients.contains_key(&id))
    }

    async fn tag_exists(&self, id: TagId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.tags.contains_key(&id))
    }

    async fn recipe_name_taken(
        &self,
        author: UserId,
        name: &str,
        except: Option<RecipeId>,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.name_taken(author, name, except))
    }
}

#[async_trait]
impl RecipeRepository for MemoryStore {
    async fn get_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError> {
        let tables = self.tables.lock().await;

        Ok(ids
            .iter()
            .filter_map(|id| tables.ingredients.get(id).cloned())
            .collect())
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.tables.lock().await.recipes.get(&id).cloned())
    }

    async fn list_recipe_parts(&self, id: RecipeId) -> Result<Vec<RecipePart>, StoreError> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipe_ingredients
            .iter()
            .filter(|row| row.recipe_id == id)
            .filter_map(|row| {
                tables.ingredients.get(&row.ingredient_id).map(|i| RecipePart {
                    recipe_id: row.recipe_id,
                    ingredient_id: i.id,
                    name: i.name.to_owned(),
                    measurement_unit: i.measurement_unit.to_owned(),
                    amount: row.amount,
                })
            })
            .collect())
    }

    async fn list_recipe_tags(&self, id: RecipeId) -> Result<Vec<Tag>, StoreError> {
        let tables = self.tables.lock().await;

        let mut tags: Vec<Tag> = tables
            .recipe_tags
            .iter()
            .filter(|(recipe_id, _)| *recipe_id == id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags)
    }

    async fn insert_recipe(&self, record: &RecipeRecord) -> Result<Recipe, StoreError> {
        self.transaction(|tables| {
            tables.charge_write()?;
            if tables.name_taken(record.author_id, &record.name, None) {
                return Err(StoreError::unique_violation(
                    "unique_author_recipe".to_string(),
                ));
            }
            let recipe = Recipe {
                id: tables.next_id(),
                author_id: record.author_id,
                name: record.name.to_owned(),
                text: record.text.to_owned(),
                cooking_time: record.cooking_time,
                pub_date: Utc::now(),
                image: record.image.to_owned(),
            };
            tables.recipes.insert(recipe.id, recipe.clone());
            tables.insert_links(recipe.id, record)?;

            Ok(recipe)
        })
        .await
    }

    async fn replace_recipe(
        &self,
        id: RecipeId,
        record: &RecipeRecord,
    ) -> Result<Option<Recipe>, StoreError> {
        self.transaction(|tables| {
            if !tables.recipes.contains_key(&id) {
                return Ok(None);
            }
            if tables.name_taken(record.author_id, &record.name, Some(id)) {
                return Err(StoreError::unique_violation(
                    "unique_author_recipe".to_string(),
                ));
            }

            tables.recipe_ingredients.retain(|row| row.recipe_id != id);
            tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);

            tables.charge_write()?;
            let recipe = match tables.recipes.get_mut(&id) {
                Some(recipe) => {
                    recipe.name = record.name.to_owned();
                    recipe.text = record.text.to_owned();
                    recipe.cooking_time = record.cooking_time;
                    if record.image.is_some() {
                        recipe.image = record.image.to_owned();
                    }
                    recipe.clone()
                }
                None => return Ok(None),
            };
            tables.insert_links(id, record)?;

            Ok(Some(recipe))
        })
        .await
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        self.transaction(|tables| {
            tables.recipe_ingredients.retain(|row| row.recipe_id != id);
            tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
            tables.favorites.retain(|(_, recipe_id)| *recipe_id != id);
            tables.shopping_cart.retain(|(_, recipe_id)| *recipe_id != id);

            Ok(tables.recipes.remove(&id).is_some())
        })
        .await
    }

    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
        page: &PageRequest,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        let guard = self.tables.lock().await;
        let tables = &*guard;

        let matches: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|r| query.author.map_or(true, |author| r.author_id == author))
            .filter(|r| {
                query.tags.is_empty()
                    || tables.recipe_tags.iter().any(|(recipe_id, tag_id)| {
                        *recipe_id == r.id
                            && tables
                                .tags
                                .get(tag_id)
                                .map_or(false, |tag| query.tags.contains(&tag.slug))
                    })
            })
            .filter(|r| {
                query
                    .favorited_by
                    .map_or(true, |user| tables.favorites.contains(&(user, r.id)))
            })
            .filter(|r| {
                query
                    .in_cart_of
                    .map_or(true, |user| tables.shopping_cart.contains(&(user, r.id)))
            })
            .cloned()
            .collect();

        let total = matches.len() as i64;
        let rows = tables
            .newest_first(matches)
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();

        Ok((rows, total))
    }

    async fn list_author_recipes(
        &self,
        author: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.lock().await;

        let recipes = tables
            .recipes
            .values()
            .filter(|r| r.author_id == author)
            .cloned()
            .collect();
        let recipes = tables.newest_first(recipes).into_iter();

        Ok(match limit {
            Some(limit) => recipes.take(limit.max(0) as usize).collect(),
            None => recipes.collect(),
        })
    }

    async fn count_author_recipes(&self, author: UserId) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipes
            .values()
            .filter(|r| r.author_id == author)
            .count() as i64)
    }
}

#[async_trait]
impl MarkRepository for MemoryStore {
    async fn has_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.marks(kind).contains(&(user, recipe)))
    }

    async fn insert_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        self.transaction(|tables| {
            if tables.marks(kind).contains(&(user, recipe)) {
                return Ok(false);
            }
            tables.charge_write()?;
            Ok(tables.marks_mut(kind).insert((user, recipe)))
        })
        .await
    }

    async fn delete_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        self.transaction(|tables| Ok(tables.marks_mut(kind).remove(&(user, recipe))))
            .await
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .subscriptions
            .contains(&(subscriber, author)))
    }

    async fn insert_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError> {
        self.transaction(|tables| {
            if tables.subscriptions.contains(&(subscriber, author)) {
                return Ok(false);
            }
            tables.charge_write()?;
            Ok(tables.subscriptions.insert((subscriber, author)))
        })
        .await
    }

    async fn delete_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError> {
        self.transaction(|tables| Ok(tables.subscriptions.remove(&(subscriber, author))))
            .await
    }

    async fn fetch_subscriptions(
        &self,
        subscriber: UserId,
        page: &PageRequest,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let tables = self.tables.lock().await;

        let mut authors: Vec<User> = tables
            .subscriptions
            .iter()
            .filter(|(s, _)| *s == subscriber)
            .filter_map(|(_, author)| tables.users.get(author).cloned())
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));

        let total = authors.len() as i64;
        let rows = authors
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();

        Ok((rows, total))
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn list_cart_parts(&self, user: UserId) -> Result<Vec<CartPart>, StoreError> {
        let guard = self.tables.lock().await;
        let tables = &*guard;

        Ok(tables
            .shopping_cart
            .iter()
            .filter(|(u, _)| *u == user)
            .flat_map(|(_, recipe_id)| {
                tables
                    .recipe_ingredients
                    .iter()
                    .filter(move |row| row.recipe_id == *recipe_id)
            })
            .filter_map(|row| {
                tables.ingredients.get(&row.ingredient_id).map(|i| CartPart {
                    name: i.name.to_owned(),
                    measurement_unit: i.measurement_unit.to_owned(),
                    amount: row.amount,
                })
            })
            .collect())
    }
}
