pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const PAGE_QUERY_PARAM: &str = "page";
pub const PAGE_SIZE_QUERY_PARAM: &str = "limit";
pub const RECIPES_LIMIT_QUERY_PARAM: &str = "recipes_limit";

pub const SESSION_COOKIE: &str = "session";

pub const SHOPPING_LIST_HEADING: &str = "Ingredient list:";
pub const SHOPPING_LIST_FILE_STEM: &str = "shopping_cart";

