//! Closed and open type references.

use crate::error::{ResolutionError, Result};
use std::fmt;
use std::sync::Arc;

/// A closed type: either a plain named type or a generic definition instantiated
/// with concrete arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    Named(Arc<str>),
    Generic {
        definition: Arc<str>,
        arguments: Arc<[TypeRef]>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    pub fn generic(
        definition: impl Into<Arc<str>>,
        arguments: impl IntoIterator<Item = TypeRef>,
    ) -> Self {
        Self::Generic {
            definition: definition.into(),
            arguments: arguments.into_iter().collect(),
        }
    }

    /// Name of the type, or of its generic definition
    pub fn definition_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Generic { definition, .. } => definition,
        }
    }

    /// Generic arguments; empty for named types
    pub fn arguments(&self) -> &[TypeRef] {
        match self {
            Self::Named(_) => &[],
            Self::Generic { arguments, .. } => arguments,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Generic { .. })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Generic {
                definition,
                arguments,
            } => {
                write!(f, "{definition}<")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ">")
            }
        }
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

/// An open type as written inside a declaration. `Parameter(i)` refers to the
/// i-th generic parameter of the enclosing definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Named(Arc<str>),
    Parameter(usize),
    Generic {
        definition: Arc<str>,
        arguments: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    pub fn param(index: usize) -> Self {
        Self::Parameter(index)
    }

    pub fn generic(
        definition: impl Into<Arc<str>>,
        arguments: impl IntoIterator<Item = TypeExpr>,
    ) -> Self {
        Self::Generic {
            definition: definition.into(),
            arguments: arguments.into_iter().collect(),
        }
    }

    /// True when the expression mentions no generic parameter
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Named(_) => true,
            Self::Parameter(_) => false,
            Self::Generic { arguments, .. } => arguments.iter().all(TypeExpr::is_closed),
        }
    }

    /// Replace every parameter reference with the matching actual argument
    pub fn substitute(&self, arguments: &[TypeRef]) -> Result<TypeRef> {
        match self {
            Self::Named(name) => Ok(TypeRef::Named(name.clone())),
            Self::Parameter(index) => arguments.get(*index).cloned().ok_or_else(|| {
                ResolutionError::malformed(
                    format!("T{index}"),
                    format!(
                        "generic parameter index {index} is out of range for {} argument(s)",
                        arguments.len()
                    ),
                )
            }),
            Self::Generic {
                definition,
                arguments: inner,
            } => {
                let closed = inner
                    .iter()
                    .map(|expr| expr.substitute(arguments))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeRef::generic(definition.clone(), closed))
            }
        }
    }
}

impl From<TypeRef> for TypeExpr {
    fn from(type_ref: TypeRef) -> Self {
        match type_ref {
            TypeRef::Named(name) => Self::Named(name),
            TypeRef::Generic {
                definition,
                arguments,
            } => Self::Generic {
                definition,
                arguments: arguments.iter().cloned().map(TypeExpr::from).collect(),
            },
        }
    }
}

impl From<&str> for TypeExpr {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}
