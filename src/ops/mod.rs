pub mod deps;
pub mod fields;
pub mod labels;
pub mod projection;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;
