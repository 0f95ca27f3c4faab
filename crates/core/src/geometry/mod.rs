pub mod letterbox;
pub mod oval_mask;
