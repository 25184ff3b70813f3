
//! Simple math utilities.


/// Simple two-dimensional vector of any numerical type.
/// Supports only few mathematical operations
/// as this is used mainly as data struct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2<T> (pub T, pub T);

impl<T> Vec2<T> {

    /// Maps all components of this vector to a new type, yielding a vector of that new type.
    pub fn map<B>(self, map: impl Fn(T) -> B) -> Vec2<B> {
        Vec2(map(self.0), map(self.1))
    }

    /// Seeing this vector as a dimension or size (width and height),
    /// this returns the area that this dimensions contains (`width * height`).
    pub fn area(self) -> T where T: std::ops::Mul<T, Output = T> {
        self.0 * self.1
    }

    /// The first component of this 2D vector.
    #[inline] pub fn x(self) -> T where T: Copy { self.0 }

    /// The second component of this 2D vector.
    #[inline] pub fn y(self) -> T where T: Copy { self.1 }

    /// The first component of this 2D vector.
    #[inline] pub fn width(self) -> T where T: Copy { self.0 }

    /// The second component of this 2D vector.
    #[inline] pub fn height(self) -> T where T: Copy { self.1 }
}


impl<T: std::ops::Add<T>> std::ops::Add<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn add(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 + other.0, self.1 + other.1)
    }
}

impl<T: std::ops::Sub<T>> std::ops::Sub<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn sub(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 - other.0, self.1 - other.1)
    }
}

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self { Vec2(x, y) }
}

impl<T> From<Vec2<T>> for (T, T) {
    fn from(vec2: Vec2<T>) -> Self { (vec2.0, vec2.1) }
}


/// A rectangular section of pixels, in full-image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {

    /// The top left corner of this rectangle.
    pub position: Vec2<usize>,

    /// How many pixels to include in this rectangle.
    /// Extends to the right and downwards.
    pub size: Vec2<usize>,
}

impl Rect {

    /// Create a rectangle from its top left corner and its size.
    pub fn new(position: impl Into<Vec2<usize>>, size: impl Into<Vec2<usize>>) -> Self {
        Rect { position: position.into(), size: size.into() }
    }

    /// The exclusive bottom right corner.
    pub fn end(self) -> Vec2<usize> {
        self.position + self.size
    }

    /// The pixel in the middle of this rectangle, rounded down.
    pub fn center(self) -> Vec2<usize> {
        self.position + self.size.map(|length| length / 2)
    }

    /// Whether the two rectangles share at least one pixel.
    pub fn intersects(self, other: Rect) -> bool {
        let (end, other_end) = (self.end(), other.end());

        self.position.x() < other_end.x() && other.position.x() < end.x()
            && self.position.y() < other_end.y() && other.position.y() < end.y()
    }
}


/// Round up or down in specific calculations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RoundingMode {

    /// Round down.
    Down,

    /// Round up.
    Up,
}

impl RoundingMode {
    pub(crate) fn divide(self, dividend: usize, divisor: usize) -> usize {
        match self {
            RoundingMode::Up => (dividend + divisor - 1) / divisor, // only works for positive numbers
            RoundingMode::Down => dividend / divisor,
        }
    }
}
