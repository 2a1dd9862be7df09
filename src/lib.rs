pub mod logger;
pub mod thermal_pipeline;
