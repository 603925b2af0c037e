//! Directory (registry) integration
//!
//! One capability trait, [`DirectoryApi`], with two implementations selected
//! by `directory.api`:
//!
//! - [`DirectoryRestClient`] - Molgenis REST v2
//! - [`DirectoryGraphqlClient`] - EMX2 GraphQL
//!
//! [`with_fallback`] runs a call against the national node and then against
//! the country-agnostic endpoint.

pub mod factory;
pub mod fallback;
pub mod graphql;
pub(crate) mod models;
pub mod rest;
pub mod traits;

pub use factory::create_directory_client;
pub use fallback::{accepted, with_fallback, DirectoryCodeValidator};
pub use graphql::DirectoryGraphqlClient;
pub use rest::DirectoryRestClient;
pub use traits::{DirectoryApi, DirectoryResult, Endpoint};
