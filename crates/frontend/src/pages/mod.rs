pub mod forecast_entry;
