//! Synthesis subdomain: the Snapshot and the orchestrator-side policies
//! applied to it (agreements, missing-data flags, conflicts, overrides,
//! validation).

pub mod agreement;
pub mod conflict;
pub mod critical;
pub mod overrides;
pub mod parsing;
pub mod request;
pub mod snapshot;
pub mod validation;
