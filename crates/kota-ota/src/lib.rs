//! Over-the-air bundle updates.
//!
//! At app start the host constructs an [`OtaClient`] for the running build, calls
//! [`OtaClient::run`] once, and then asks the [`BundleStore`] whether an override bundle
//! should be booted instead of the one packaged with the app. Failures are reported as
//! [`OtaOutcome::Failed`] and never prevent booting the packaged bundle.

mod client;
mod error;
mod link;
mod store;

pub use client::{InstalledVersion, NoUpdateReason, OtaClient, OtaConfig, OtaOutcome, UpdateDecision};
pub use error::OtaError;
pub use link::direct_download_link;
pub use store::{BundleStore, BUNDLE_FILE_NAME};
