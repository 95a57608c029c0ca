//! Drawing tools and the gesture state machine that drives them.

mod gesture;

pub use gesture::{GestureMachine, GestureState};

use crate::error::ShapeError;
use crate::shapes::ShapeType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Rectangle,
    Circle,
    Line,
    Text,
}

impl ToolKind {
    /// The shape variant this tool draws, if any.
    pub fn shape_type(&self) -> Option<ShapeType> {
        match self {
            ToolKind::Select => None,
            ToolKind::Rectangle => Some(ShapeType::Rectangle),
            ToolKind::Circle => Some(ShapeType::Circle),
            ToolKind::Line => Some(ShapeType::Line),
            ToolKind::Text => Some(ShapeType::Text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Line => "line",
            ToolKind::Text => "text",
        }
    }

    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Select,
            ToolKind::Rectangle,
            ToolKind::Circle,
            ToolKind::Line,
            ToolKind::Text,
        ]
    }
}

impl From<ShapeType> for ToolKind {
    fn from(shape_type: ShapeType) -> Self {
        match shape_type {
            ShapeType::Rectangle => ToolKind::Rectangle,
            ShapeType::Circle => ToolKind::Circle,
            ShapeType::Line => ToolKind::Line,
            ShapeType::Text => ToolKind::Text,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "select" {
            return Ok(ToolKind::Select);
        }
        s.parse::<ShapeType>().map(ToolKind::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_shape_types() {
        assert_eq!(ToolKind::Select.shape_type(), None);
        for tool in ToolKind::all().iter().skip(1) {
            let shape_type = tool.shape_type().unwrap();
            assert_eq!(ToolKind::from(shape_type), *tool);
        }
    }

    #[test]
    fn test_parse_tool() {
        assert_eq!("circle".parse::<ToolKind>(), Ok(ToolKind::Circle));
        assert_eq!("select".parse::<ToolKind>(), Ok(ToolKind::Select));
        assert!("eraser".parse::<ToolKind>().is_err());
    }
}
