//! Narrow 2D physics facade over rapier2d: circles and rectangles, category/mask
//! filtering, sensors, anchor springs and per-step overlap start/end reporting.
//! No gravity, no rotation.

mod shapes;
mod world;

pub use shapes::Shape;
pub use world::{
    Body, BodyDesc, BodyId, BodyPair, ConstraintId, ContactBody, PhysicsWorld, SpringDesc,
    StepReport,
};
