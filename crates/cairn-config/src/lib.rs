pub mod annotations;
pub mod config;
pub mod error;
pub mod remote;
pub mod settings;

#[cfg(test)]
pub mod test_utils;
