//! Storage backends for community-scoped resources.

pub mod fs_resource_repository;
pub mod pg_resource_repository;
pub mod schema;
