// src/lang.rs
use tree_sitter::Language;

/// The source languages dupgraph can analyze. Python is the only grammar
/// shipped today; the enum keeps file dispatch in one place for when that
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Python,
}

impl Lang {
    #[must_use]
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyi" => Some(Self::Python),
            _ => None,
        }
    }

    #[must_use]
    pub fn grammar(self) -> Language {
        match self {
            Self::Python => tree_sitter_python::language(),
        }
    }
}
