//! Shared application state handed to the router.

use std::sync::Arc;

use crate::services::{
    auth_service::AuthService, image_service::ImageService, object_store::FsObjectStore,
};

#[derive(Clone)]
pub struct AppState {
    /// Lifecycle coordinator for catalogued images.
    pub images: ImageService,

    /// Accounts, credentials, and bearer tokens.
    pub auth: AuthService,

    /// Concrete blob store, used directly by the download and readiness
    /// handlers (the catalog itself only sees the `ObjectStore` trait).
    pub files: Arc<FsObjectStore>,
}
