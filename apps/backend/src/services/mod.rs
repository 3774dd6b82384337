pub mod disconnect;
pub mod reaper;
pub mod room_locks;
pub mod sessions;
