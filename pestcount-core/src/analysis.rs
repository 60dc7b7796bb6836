pub mod bbox;
pub mod count;
pub mod detection;
pub mod insects;
pub mod labels;
