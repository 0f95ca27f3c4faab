pub mod detection_decoder;
pub mod face_detector;
pub mod face_locator;
