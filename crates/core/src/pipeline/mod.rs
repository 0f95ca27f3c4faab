pub mod face_lock_use_case;
