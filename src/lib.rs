//! Shipyard - application resource staging for cluster submission
//!
//! Stages the files an application ships (local files, local directory trees
//! and already-remote artifacts) into a private directory in shared storage,
//! reuses pre-shared libraries instead of uploading duplicates, and produces
//! the resource table and deterministic classpath a container launch needs.

pub mod application;
pub mod config;
pub mod consistency;
pub mod error;
pub mod logging;
pub mod registrar;
pub mod shared_libs;
pub mod staging;
pub mod uploader;

pub use application::{application_dir, ApplicationId};
pub use consistency::{ConsistencyWaiter, Delay, Interrupted, RetryPolicy, ThreadSleep};
pub use error::StagingError;
pub use registrar::{Registration, ResourceRegistrar, ResourceTable, TableInsert};
pub use shared_libs::{DuplicateName, SharedLibraryEntry, SharedLibraryError, SharedLibraryIndex};
pub use staging::{
    BulkStager, DistBundlePattern, DistBundleRule, ShippedArtifacts, StagingManifest,
    StagingOutcome,
};
pub use uploader::{ApplicationFileUploader, StagingOptions};
