#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Line,
}

/// Active editing tool, shared by every mounted surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    #[default]
    Select,
    Text,
    Highlight,
    Draw,
    Shape(ShapeKind),
    Image,
    Whiteout,
    Eraser,
}

/// Pointer hint a surface shows for the active tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Text,
    Crosshair,
}

impl Tool {
    pub fn cursor(&self) -> Cursor {
        match self {
            Self::Text => Cursor::Text,
            Self::Draw => Cursor::Crosshair,
            _ => Cursor::Default,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Draw)
    }

    pub fn allows_selection(&self) -> bool {
        matches!(self, Self::Select)
    }
}
