/// Result alias that carries the custom [`MandalaError`] type.
pub type Result<T> = std::result::Result<T, MandalaError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MandalaError {
    /// A `[min, max]` range where `min` exceeds `max`, or float bounds whose
    /// span is not a finite number.
    #[error("invalid bounds for {name}: min {min} exceeds max {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },
    /// A count range reaching past what the generator will draw.
    #[error("{name} max {max} exceeds the limit of {limit}")]
    CountLimit { name: String, max: u32, limit: u32 },
    /// Colour strings must be `#rrggbb`.
    #[error("invalid colour format `{0}`, expected #rrggbb")]
    InvalidColorFormat(String),
    /// The handle refers to a node that was released or cleared.
    #[error("stale render surface handle {0}")]
    StaleNode(String),
    /// Path-only operation invoked on a group or `use` node.
    #[error("render surface node {0} is not a path")]
    NotAPath(String),
    /// SVG parsing or rasterisation failed.
    #[error("export failed: {0}")]
    Export(String),
    /// PNG encoding or file output from the `image` crate.
    #[error("{0}")]
    Image(#[from] image::ImageError),
    /// Configuration JSON that failed to parse or serialise.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form message for errors without a dedicated variant.
    #[error("{0}")]
    Message(String),
}

impl MandalaError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn bounds(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::InvalidBounds {
            name: name.into(),
            min,
            max,
        }
    }
}

impl From<&str> for MandalaError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MandalaError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
