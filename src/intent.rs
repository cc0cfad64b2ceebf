//! Keyword interpretation of free-text object descriptions. The same
//! description always yields the same shape and colour.

use serde::{Deserialize, Serialize};

use crate::geometry::Shape;

pub const DEFAULT_COLOR: u32 = 0x00ff00;
pub const EMPTY_DESCRIPTION_HINT: &str = "Please describe an object.";

/// Shape and colour picked for a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    pub shape: Shape,
    /// Packed `0xRRGGBB`.
    pub color: u32,
    /// Set when the description could not be used at all.
    pub hint: Option<String>,
}

pub fn interpret(description: &str) -> Interpretation {
    if description.trim().is_empty() {
        return Interpretation {
            shape: Shape::Box,
            color: DEFAULT_COLOR,
            hint: Some(EMPTY_DESCRIPTION_HINT.to_string()),
        };
    }

    let text = description.to_lowercase();
    let shape = if text.contains("sphere") || text.contains("ball") {
        Shape::Sphere
    } else if text.contains("cone") {
        Shape::Cone
    } else {
        Shape::Box
    };

    let color = if text.contains("red") {
        0xff0000
    } else if text.contains("blue") {
        0x0000ff
    } else if text.contains("yellow") {
        0xffff00
    } else {
        DEFAULT_COLOR
    };

    Interpretation {
        shape,
        color,
        hint: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_description_asks_for_input() {
        let result = interpret("   ");
        assert_eq!(result.shape, Shape::Box);
        assert_eq!(result.color, DEFAULT_COLOR);
        assert_eq!(result.hint.as_deref(), Some(EMPTY_DESCRIPTION_HINT));
    }

    #[test]
    fn detects_shapes_by_keyword() {
        assert_eq!(interpret("a blue sphere").shape, Shape::Sphere);
        assert_eq!(interpret("a Beach BALL").shape, Shape::Sphere);
        assert_eq!(interpret("traffic cone").shape, Shape::Cone);
        assert_eq!(interpret("a yellow hard hat").shape, Shape::Box);
    }

    #[test]
    fn sphere_wins_over_cone() {
        assert_eq!(interpret("a cone with a ball on top").shape, Shape::Sphere);
    }

    #[test]
    fn detects_colours_in_priority_order() {
        assert_eq!(interpret("red ball").color, 0xff0000);
        assert_eq!(interpret("blue and yellow crate").color, 0x0000ff);
        assert_eq!(interpret("a yellow hard hat").color, 0xffff00);
        assert_eq!(interpret("a plain crate").color, DEFAULT_COLOR);
        assert!(interpret("a plain crate").hint.is_none());
    }
}
