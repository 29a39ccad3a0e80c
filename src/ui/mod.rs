pub mod features;
pub mod panels;
pub mod plot;
pub mod table;
