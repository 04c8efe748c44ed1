pub mod object_tracker;
pub mod track_history;
pub mod tracked_object;
