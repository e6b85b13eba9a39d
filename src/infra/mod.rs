pub mod conversion_output_adapter;

pub use conversion_output_adapter::FileConversionOutputAdapter;
