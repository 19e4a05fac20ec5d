//! Getting at the sites: plain HTTP fetches, browser auth and the cookie
//! hand-off between the two.

pub mod auth;
pub mod http_client;
pub mod http_session;
pub mod storage_state;
