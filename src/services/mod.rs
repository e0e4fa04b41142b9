pub mod body_battery;
pub mod coach;
pub mod llm;
pub mod plan_generator;
pub mod recovery;
pub mod task_adapter;
