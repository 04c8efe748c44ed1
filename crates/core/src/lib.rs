pub mod alerts;
pub mod events;
pub mod identity;
pub mod pipeline;
pub mod shared;
pub mod tracking;
