mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod payload;
    pub mod schema;
    pub mod store;
    pub mod validation;
    pub mod views;
}
mod authentication {
    pub mod middleware;
    pub mod session;
}
mod config;
mod constants;
mod document;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use document::*;
