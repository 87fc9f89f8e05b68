pub mod commands;
pub mod context;
pub mod doctor;
pub mod env;
pub mod fs_utils;
pub mod git;
pub mod migrate;
pub mod paths;
pub mod project;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
