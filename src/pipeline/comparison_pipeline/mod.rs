pub mod comparison_pipeline;
