mod error;
pub use error::{Error, Result};

pub mod ext_oauth2;

pub mod config;
pub mod token;
pub mod utils;

pub mod cache;
pub mod client;
pub mod credentials;
pub mod prompt;
pub mod saml;
pub mod secret_store;

pub mod federation;
pub mod mfa;
pub mod onelogin;
pub mod saml_session;

pub mod broker;

pub mod cmd;
