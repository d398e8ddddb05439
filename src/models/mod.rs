pub mod compare_model;
