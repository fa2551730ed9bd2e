pub mod training_data;
