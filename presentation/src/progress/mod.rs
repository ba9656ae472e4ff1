//! Progress reporting for consultation submissions

pub mod reporter;
