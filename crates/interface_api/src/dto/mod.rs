//! Request and response bodies

pub mod billing;
