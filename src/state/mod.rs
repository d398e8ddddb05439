pub mod compare_state;
