//! Shipyard Resource Types
//!
//! Descriptors for artifacts registered with the cluster resource manager and
//! the encoding used to ship them to containers.

pub mod descriptor;
pub mod error;

pub use descriptor::{
    decode_ship_list, encode_ship_list, ArtifactDescriptor, LocalResource, Visibility,
};
pub use error::ResourceError;
