pub mod bounds;
pub mod options;
pub mod point;
pub mod tileset;
pub mod vector3;
