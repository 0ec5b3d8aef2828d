pub mod districts_csv;
pub mod import_realized;
pub mod verify;
