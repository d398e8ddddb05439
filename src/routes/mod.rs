pub mod compare;
pub mod root;
