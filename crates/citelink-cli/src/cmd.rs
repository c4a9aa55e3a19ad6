pub mod build_filter;
pub mod corpus;
pub mod extract;
pub mod harvest;
pub mod join;
