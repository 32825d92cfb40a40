use serde::{Deserialize, Serialize};

use crate::{
    config::Settings,
    constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PAGE_QUERY_PARAM, PAGE_SIZE_QUERY_PARAM},
    error::TypeError,
    form::Form,
};

/// Page-number pagination; `limit` overrides the configured page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Reads `page` and `limit`; without `limit` the configured page size applies.
    pub fn from_form(form: &Form, settings: &Settings) -> Result<Self, TypeError> {
        let page = form.get_number::<i64>(PAGE_QUERY_PARAM)?.unwrap_or(1);
        if page < 1 {
            return Err(TypeError::new("Invalid page"));
        }
        let limit = form
            .get_number::<i64>(PAGE_SIZE_QUERY_PARAM)?
            .unwrap_or(settings.page_size);

        let request = Self::new(page, limit);
        if (request.page - 1).checked_mul(request.limit).is_none() {
            return Err(TypeError::new("Invalid page"));
        }

        Ok(request)
    }

    /// Saturates instead of overflowing for pages built directly with a huge `page`.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit.max(1))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(results: Vec<T>, count: i64, request: &PageRequest) -> Self {
        let seen = request.offset().saturating_add(results.len() as i64);
        let next = if !results.is_empty() && seen < count {
            request.page.checked_add(1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(page_size: i64) -> Settings {
        Settings {
            database_url: "postgres://localhost/foodgram".to_string(),
            session_secret: "secret".to_string(),
            page_size,
            max_connections: 1,
        }
    }

    #[test]
    fn defaults_to_first_page_of_configured_size() {
        let form = Form::from_query(HashMap::new());
        let request = PageRequest::from_form(&form, &settings(DEFAULT_PAGE_SIZE)).unwrap();

        assert_eq!(request, PageRequest::new(1, 6));
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn limit_overrides_page_size() {
        let query = HashMap::from([
            ("page".to_string(), "3".to_string()),
            ("limit".to_string(), "4".to_string()),
        ]);
        let request = PageRequest::from_form(&Form::from_query(query), &settings(10)).unwrap();

        assert_eq!(request.limit, 4);
        assert_eq!(request.offset(), 8);
    }

    #[test]
    fn zero_page_is_rejected() {
        let query = HashMap::from([("page".to_string(), "0".to_string())]);

        assert!(PageRequest::from_form(&Form::from_query(query), &settings(6)).is_err());
    }

    #[test]
    fn configured_page_size_applies_without_limit() {
        let form = Form::from_query(HashMap::new());
        let request = PageRequest::from_form(&form, &settings(12)).unwrap();

        assert_eq!(request.limit, 12);
    }

    #[test]
    fn page_whose_offset_overflows_is_rejected() {
        let query = HashMap::from([("page".to_string(), i64::MAX.to_string())]);

        assert!(PageRequest::from_form(&Form::from_query(query), &settings(6)).is_err());
    }

    #[test]
    fn huge_page_offset_saturates() {
        let request = PageRequest::new(i64::MAX, 6);

        assert_eq!(request.offset(), i64::MAX);

        let page = Page::from_rows(vec![0; 1], 10, &request);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(i64::MAX - 1));
    }

    #[test]
    fn links_follow_position() {
        let request = PageRequest::new(2, 6);
        let page = Page::from_rows(vec![0; 6], 20, &request);

        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::from_rows(vec![0; 2], 20, &PageRequest::new(4, 6));
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(3));
    }
}
