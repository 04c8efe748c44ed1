pub mod face;
pub mod face_recognizer;
pub mod identity_matcher;
pub mod identity_store;
pub mod reference_identity;
