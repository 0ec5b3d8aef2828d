pub mod category_panel;
pub mod date_panel;
pub mod district_picker;
pub mod legend;
pub mod map_view;
