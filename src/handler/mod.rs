pub mod compare_handler;
