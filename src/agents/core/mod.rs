//! Agent runtime implementations

mod react;

pub use react::ReActRuntime;
