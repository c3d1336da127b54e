pub mod mask;
pub mod renderer;
