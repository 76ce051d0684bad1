use rapier2d::prelude::SharedShape;

use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half_width: f32, half_height: f32 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle {
            radius: radius.max(0.0),
        }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            half_width: (width / 2.0).max(0.0),
            half_height: (height / 2.0).max(0.0),
        }
    }

    /// Whether `point` lies inside the shape centered at `center` (boundary inclusive).
    pub fn contains(&self, center: Vec2, point: Vec2) -> bool {
        match *self {
            Shape::Circle { radius } => center.distance(point) <= radius,
            Shape::Rect {
                half_width,
                half_height,
            } => {
                (point.x - center.x).abs() <= half_width
                    && (point.y - center.y).abs() <= half_height
            }
        }
    }

    pub(crate) fn to_shared(self) -> SharedShape {
        match self {
            Shape::Circle { radius } => SharedShape::ball(radius),
            Shape::Rect {
                half_width,
                half_height,
            } => SharedShape::cuboid(half_width, half_height),
        }
    }
}
