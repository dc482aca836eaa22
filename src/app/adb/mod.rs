pub mod bridge;
pub mod locator;
pub mod paths;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;
