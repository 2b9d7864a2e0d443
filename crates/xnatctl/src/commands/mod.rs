//! Command handlers grouped by concern.

pub(crate) mod access;
pub(crate) mod groups;
pub(crate) mod projects;
pub(crate) mod sessions;
pub(crate) mod users;
