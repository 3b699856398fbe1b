//! Partner imagery: clothing and prompt construction, the Leonardo client,
//! stored generations and the background catalog.

pub mod backgrounds;
pub mod clothing;
pub mod leonardo;
pub mod prompt;
pub mod service;
pub mod store;
