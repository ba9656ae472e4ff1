//! Output gate vocabulary: views, the cached expansion state and its
//! projections.

pub mod projection;
pub mod state;
pub mod view;
