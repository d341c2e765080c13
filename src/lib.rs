pub mod autofix_config;
pub mod ci;
pub mod diagnostics;
pub mod errors;
pub mod github;
pub mod remediation;
pub mod repo;
pub mod util;

#[cfg(test)]
mod test_support;
