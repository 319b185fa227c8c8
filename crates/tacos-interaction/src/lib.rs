//! Wire-level interaction with the remote ordering site.
//!
//! Everything in this crate is stateless: it builds requests, sends them
//! through [`RemoteHttp`], and turns responses into domain values. Session
//! state and retries live in the application layer.

pub mod classify;
pub mod cookies;
pub mod decoder;
pub mod forms;
pub mod http;

pub use classify::{ResponseClass, classify};
pub use cookies::{parse_cookie_header, parse_set_cookie, parse_set_cookies};
pub use http::{
    HttpMethod, RemoteBody, RemoteHttp, RemoteRequest, RemoteResponse, ReqwestRemote,
    TOKEN_FIELD, TOKEN_HEADER,
};
