pub mod model_resolver;
pub mod model_resource_manager;
pub mod onnx_face_detector;
pub mod output_binding;
