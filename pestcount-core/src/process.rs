pub mod decode;
pub mod encode;
pub mod letterbox;
pub mod nms;
