//! Service layer: the image lifecycle coordinator and its collaborators.

pub mod auth_service;
pub mod image_service;
pub mod object_store;
pub mod transcoder;
