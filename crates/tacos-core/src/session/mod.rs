//! Order session domain module.
//!
//! # Module Structure
//!
//! - `model`: Core session model (`OrderSession`, `CookieMap`)
//! - `repository`: Repository trait for durable session persistence

mod model;
mod repository;

pub use model::{CookieMap, OrderSession, merge_cookie_maps, render_cookie_header};
pub use repository::SessionRepository;
