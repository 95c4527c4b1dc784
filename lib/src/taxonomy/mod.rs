mod listable;
mod tags;
mod node;
mod resolve;
mod navigation;
mod tree;
mod renderer;

pub use listable::*;
pub use tags::*;
pub use node::*;
pub use resolve::*;
pub use tree::*;
pub use renderer::*;
