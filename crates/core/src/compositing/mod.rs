pub mod alpha_blend;
pub mod patch;
