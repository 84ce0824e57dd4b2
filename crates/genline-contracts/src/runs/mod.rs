pub mod last_render;
