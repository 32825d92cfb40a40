use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder, Transaction};

use super::{
    CartRepository, MarkRepository, RecipeQuery, RecipeRecord, RecipeRepository,
    ReferenceLookup, SubscriptionRepository,
};
use crate::{
    config::Settings,
    error::StoreError,
    pagination::PageRequest,
    schema::{
        CartPart, Ingredient, IngredientId, MarkKind, Recipe, RecipeId, RecipePart, RecipeRow,
        Tag, TagId, User, UserId, UserRow,
    },
};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Opens the pool described by `settings` and applies pending migrations.
    pub async fn connect(settings: &Settings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Connected to database, migrations applied");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

async fn insert_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    record: &RecipeRecord,
) -> Result<(), StoreError> {
    if !record.parts.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position) ",
        );
        builder.push_values(
            record.parts.iter().enumerate(),
            |mut row, (position, part)| {
                row.push_bind(recipe_id)
                    .push_bind(part.ingredient_id)
                    .push_bind(part.amount)
                    .push_bind(position as i32);
            },
        );
        builder.build().execute(&mut **tx).await?;
    }

    if !record.tags.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        builder.push_values(record.tags.iter(), |mut row, tag_id| {
            row.push_bind(recipe_id).push_bind(*tag_id);
        });
        builder.build().execute(&mut **tx).await?;
    }

    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &RecipeQuery) {
    if let Some(author) = query.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !query.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(query.tags.clone())
            .push("))");
    }
    if let Some(user) = query.favorited_by {
        builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user)
            .push(")");
    }
    if let Some(user) = query.in_cart_of {
        builder
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user)
            .push(")");
    }
}

#[async_trait]
impl ReferenceLookup for PgStore {
    async fn ingredient_exists(&self, id: IngredientId) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM ingredients WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn tag_exists(&self, id: TagId) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tags WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn recipe_name_taken(
        &self,
        author: UserId,
        name: &str,
        except: Option<RecipeId>,
    ) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(
            "
            SELECT EXISTS (
                SELECT 1 FROM recipes
                WHERE author_id = $1 AND name = $2 AND ($3::INTEGER IS NULL OR id <> $3)
            )
        ",
        )
        .bind(author)
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

#[async_trait]
impl RecipeRepository for PgStore {
    async fn get_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError> {
        let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_recipe_parts(&self, id: RecipeId) -> Result<Vec<RecipePart>, StoreError> {
        let rows: Vec<RecipePart> = sqlx::query_as(
            "
            SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
                i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.position
        ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_recipe_tags(&self, id: RecipeId) -> Result<Vec<Tag>, StoreError> {
        let rows: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.* FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.name
        ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_recipe(&self, record: &RecipeRecord) -> Result<Recipe, StoreError> {
        let mut tx = self.pool.begin().await?;

        let recipe: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, text, cooking_time, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(record.author_id)
        .bind(&record.name)
        .bind(&record.text)
        .bind(record.cooking_time)
        .bind(&record.image)
        .fetch_one(&mut *tx)
        .await?;

        insert_links(&mut tx, recipe.id, record).await?;
        tx.commit().await?;

        Ok(recipe)
    }

    async fn replace_recipe(
        &self,
        id: RecipeId,
        record: &RecipeRecord,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent replaces of the same recipe.
        let locked: Option<(RecipeId,)> =
            sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let recipe: Recipe = sqlx::query_as(
            "
            UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
            WHERE id = $5
            RETURNING *
        ",
        )
        .bind(&record.name)
        .bind(&record.text)
        .bind(record.cooking_time)
        .bind(&record.image)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        insert_links(&mut tx, id, record).await?;
        tx.commit().await?;

        Ok(Some(recipe))
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        for table in ["recipe_ingredients", "recipe_tags", "favorites", "shopping_cart"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
        page: &PageRequest,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
        push_filters(&mut builder, query);
        builder
            .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<RecipeRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        // COUNT() OVER() is absent when the page is past the end.
        let total = match rows.first() {
            Some(row) => row.count,
            None => self.count_matches(query).await?,
        };

        Ok((rows.into_iter().map(Recipe::from).collect(), total))
    }

    async fn list_author_recipes(
        &self,
        author: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, StoreError> {
        let rows: Vec<Recipe> = sqlx::query_as(
            "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
        )
        .bind(author)
        .bind(limit.map(|limit| limit.max(0)))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author: UserId) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}

impl PgStore {
    async fn count_matches(&self, query: &RecipeQuery) -> Result<i64, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        push_filters(&mut builder, query);

        let row: (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;

        Ok(row.0)
    }
}

#[async_trait]
impl MarkRepository for PgStore {
    async fn has_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
            kind.table()
        ))
        .bind(user)
        .bind(recipe)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn insert_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table()
        ))
        .bind(user)
        .bind(recipe)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            kind.table()
        ))
        .bind(user)
        .bind(recipe)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2)",
        )
        .bind(subscriber)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn insert_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(subscriber)
        .bind(author)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
                .bind(subscriber)
                .bind(author)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_subscriptions(
        &self,
        subscriber: UserId,
        page: &PageRequest,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "
            SELECT u.*, COUNT(*) OVER() AS count
            FROM subscriptions s
            INNER JOIN users u ON u.id = s.author_id
            WHERE s.subscriber_id = $1
            ORDER BY u.username
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(subscriber)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = match rows.first() {
            Some(row) => row.count,
            None => {
                let row: (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                        .bind(subscriber)
                        .fetch_one(&self.pool)
                        .await?;
                row.0
            }
        };

        Ok((rows.into_iter().map(User::from).collect(), total))
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn list_cart_parts(&self, user: UserId) -> Result<Vec<CartPart>, StoreError> {
        let rows: Vec<CartPart> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM shopping_cart c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
        ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
