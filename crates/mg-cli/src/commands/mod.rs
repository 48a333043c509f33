//! CLI command implementations

pub(crate) mod common;
pub(crate) mod info;
pub(crate) mod ls;
pub(crate) mod migrate;
pub(crate) mod new;
pub(crate) mod rollback;
pub(crate) mod status;

#[cfg(test)]
pub(crate) mod test_utils;
