use std::fmt;

pub const WORD_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Integer,
    Real,
    Boolean,
    String,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Integer => "integer",
            Primitive::Real => "real",
            Primitive::Boolean => "boolean",
            Primitive::String => "string",
        }
    }
}

/// A primitive kind plus the extents of zero or more array dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ty {
    pub primitive: Primitive,
    pub dimensions: Vec<i64>,
}

impl Ty {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            dimensions: vec![],
        }
    }

    pub fn array(primitive: Primitive, dimensions: Vec<i64>) -> Self {
        Self {
            primitive,
            dimensions,
        }
    }

    pub fn void() -> Self {
        Self::new(Primitive::Void)
    }

    pub fn integer() -> Self {
        Self::new(Primitive::Integer)
    }

    pub fn real() -> Self {
        Self::new(Primitive::Real)
    }

    pub fn boolean() -> Self {
        Self::new(Primitive::Boolean)
    }

    pub fn string() -> Self {
        Self::new(Primitive::String)
    }

    pub fn is_void(&self) -> bool {
        self.primitive == Primitive::Void
    }

    /// Only scalars may be operands, assignment targets, or read/print targets.
    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty() && !self.is_void()
    }

    pub fn is_integer(&self) -> bool {
        self.is_scalar() && self.primitive == Primitive::Integer
    }

    pub fn is_real(&self) -> bool {
        self.is_scalar() && self.primitive == Primitive::Real
    }

    pub fn is_boolean(&self) -> bool {
        self.is_scalar() && self.primitive == Primitive::Boolean
    }

    pub fn is_string(&self) -> bool {
        self.is_scalar() && self.primitive == Primitive::String
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_real()
    }

    pub fn is_valid_array(&self) -> bool {
        self.dimensions.iter().all(|&dim| dim > 0)
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self == other
    }

    /// Whether a value of type `value` may be stored where `self` is expected.
    /// Integer promotes to real, never the reverse.
    pub fn accepts(&self, value: &Self) -> bool {
        self.is_compatible(value) || (self.is_real() && value.is_integer())
    }

    /// Type of the sub-array left after `n` leading dimensions are indexed away.
    pub fn slice(&self, n: usize) -> Option<Ty> {
        if n > self.dimensions.len() {
            return None;
        }
        Some(Ty::array(self.primitive, self.dimensions[n..].to_vec()))
    }

    /// Number of word slots, or `None` when the array is too large to be
    /// addressed with a 32-bit offset.
    pub fn element_count(&self) -> Option<usize> {
        self.sizeof().map(|size| size / WORD_SIZE)
    }

    /// Size in bytes, or `None` when it does not fit in an `i32`.
    pub fn sizeof(&self) -> Option<usize> {
        if self.primitive == Primitive::Void {
            return Some(0);
        }
        self.dimensions
            .iter()
            .try_fold(WORD_SIZE, |size, &dim| {
                size.checked_mul(usize::try_from(dim.max(0)).ok()?)
            })
            .filter(|&size| i32::try_from(size).is_ok())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primitive.as_str())?;
        if !self.dimensions.is_empty() {
            write!(f, " ")?;
            for dim in &self.dimensions {
                write!(f, "[{}]", dim)?;
            }
        }
        Ok(())
    }
}
