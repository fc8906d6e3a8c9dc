pub mod constants;
pub mod entity;
pub mod store;
pub mod spatial;
pub mod spawn;
pub mod systems;
pub mod behavior;
pub mod input_buffer;
pub mod game_loop;
pub mod world;
pub mod render;
pub mod performance;
