//! OAuth refresh clients for the two upstream credential families. Both
//! exchange a long-lived refresh token for a short-lived access token via
//! the standard OAuth2 refresh-token grant; `oauth2`'s generic
//! `RequestTokenError` converts into `ApiError` through the same
//! conversion the Antigravity/Cloud Code clients already rely on.

mod antigravity;
mod google;

pub use antigravity::AntigravityOauthClient;
pub use google::{GoogleOauthClient, RefreshedToken};
