use std::fmt;
use std::ops::{Add, AddAssign, Index};

use bytemuck::{Pod, Zeroable};

/// Single-precision quaternion `w + xi + yj + zk`.
///
/// `repr(C)` so that an interleaved buffer of `4n` floats can be reinterpreted as
/// `n` quaternions without copying.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One of the four quaternion components, in storage order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    W,
    X,
    Y,
    Z,
}

impl Component {
    /// All components in storage order.
    pub const ALL: [Component; 4] = [Component::W, Component::X, Component::Y, Component::Z];

    /// Offset of this component inside an interleaved quaternion.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Component::W => 0,
            Component::X => 1,
            Component::Y => 2,
            Component::Z => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Component::W => "w",
            Component::X => "x",
            Component::Y => "y",
            Component::Z => "z",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Quaternion {
    pub const ZERO: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 0.0);

    /// Multiplicative identity `(1, 0, 0, 0)`.
    pub const IDENTITY: Quaternion = Quaternion::new(1.0, 0.0, 0.0, 0.0);

    #[inline(always)]
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    #[inline(always)]
    pub const fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    #[inline(always)]
    pub const fn to_array(self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }

    #[inline(always)]
    pub fn component(&self, c: Component) -> f32 {
        match c {
            Component::W => self.w,
            Component::X => self.x,
            Component::Y => self.y,
            Component::Z => self.z,
        }
    }

    /// Squared Euclidean norm `w² + x² + y² + z²`.
    #[inline]
    pub fn norm_squared(&self) -> f32 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Component-wise absolute value.
    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.w.abs(), self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Matrix `L(a)` such that `a ⊗ b = L(a) · b` with `b` as a column vector.
    pub fn left_mul_matrix(&self) -> [[f32; 4]; 4] {
        let Quaternion { w, x, y, z } = *self;
        [
            [w, -x, -y, -z],
            [x, w, -z, y],
            [y, z, w, -x],
            [z, -y, x, w],
        ]
    }
}

impl From<[f32; 4]> for Quaternion {
    fn from(v: [f32; 4]) -> Self {
        Self::from_array(v)
    }
}

impl From<Quaternion> for [f32; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_array()
    }
}

impl Index<Component> for Quaternion {
    type Output = f32;

    fn index(&self, c: Component) -> &f32 {
        match c {
            Component::W => &self.w,
            Component::X => &self.x,
            Component::Y => &self.y,
            Component::Z => &self.z,
        }
    }
}

impl Add for Quaternion {
    type Output = Quaternion;

    #[inline(always)]
    fn add(self, rhs: Quaternion) -> Quaternion {
        Quaternion::new(
            self.w + rhs.w,
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
        )
    }
}

impl AddAssign for Quaternion {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Quaternion) {
        self.w += rhs.w;
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.w, self.x, self.y, self.z
        )
    }
}
