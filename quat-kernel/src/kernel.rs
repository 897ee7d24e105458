//! Common kernel interface and operand validation.

use std::fmt;
use std::str::FromStr;

use quat_view::{Layout, QuatBatch, QuatError, Quaternion, Result};

/// Kernel strategy identity, reported alongside each result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Scalar,
    Planar,
    Interleaved,
    Parallel,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Scalar,
        Strategy::Planar,
        Strategy::Interleaved,
        Strategy::Parallel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Scalar => "scalar",
            Strategy::Planar => "planar",
            Strategy::Interleaved => "interleaved",
            Strategy::Parallel => "parallel",
        }
    }

    /// Layout the strategy requires, or `None` if it accepts either.
    pub fn required_layout(self) -> Option<Layout> {
        match self {
            Strategy::Planar => Some(Layout::Planar),
            Strategy::Interleaved => Some(Layout::Interleaved),
            Strategy::Scalar | Strategy::Parallel => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy '{s}'"))
    }
}

/// A batch multiply-then-self-reduce implementation.
///
/// `multiply_into` computes `C[i] = A[i] ⊗ B[i]` for every index;
/// `self_reduce` folds `Σ_i C[i] ⊗ C[i]` into one quaternion.
pub trait BatchKernel {
    fn strategy(&self) -> Strategy;

    fn multiply_into(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<()>;

    fn self_reduce(&self, c: &QuatBatch) -> Result<Quaternion>;

    /// Multiply phase followed by the reduction phase over the product.
    fn run(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<Quaternion> {
        self.multiply_into(a, b, c)?;
        self.self_reduce(c)
    }
}

pub(crate) fn ensure_layout(batch: &QuatBatch, expected: Layout) -> Result<()> {
    if batch.layout() != expected {
        return Err(QuatError::LayoutMismatch {
            expected,
            found: batch.layout(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_same_len(a: &QuatBatch, b: &QuatBatch) -> Result<()> {
    if a.len() != b.len() {
        return Err(QuatError::LengthMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(())
}

/// Validate the three operands of a multiply: equal lengths, and the given
/// layout if the kernel needs one.
pub(crate) fn ensure_operands(
    a: &QuatBatch,
    b: &QuatBatch,
    c: &QuatBatch,
    layout: Option<Layout>,
) -> Result<()> {
    ensure_same_len(a, b)?;
    ensure_same_len(a, c)?;
    if let Some(layout) = layout {
        ensure_layout(a, layout)?;
        ensure_layout(b, layout)?;
        ensure_layout(c, layout)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_round_trip() {
        for s in Strategy::ALL {
            assert_eq!(s.name().parse::<Strategy>().unwrap(), s);
        }
        assert_eq!("PLANAR".parse::<Strategy>().unwrap(), Strategy::Planar);
        assert!("gpu".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_ensure_operands() {
        let a = QuatBatch::zeroed(4, Layout::Planar).unwrap();
        let b = QuatBatch::zeroed(4, Layout::Planar).unwrap();
        let c = QuatBatch::zeroed(5, Layout::Planar).unwrap();
        assert!(matches!(
            ensure_operands(&a, &b, &c, None),
            Err(QuatError::LengthMismatch {
                expected: 4,
                found: 5
            })
        ));

        let c = QuatBatch::zeroed(4, Layout::Interleaved).unwrap();
        assert!(ensure_operands(&a, &b, &c, None).is_ok());
        assert!(matches!(
            ensure_operands(&a, &b, &c, Some(Layout::Planar)),
            Err(QuatError::LayoutMismatch {
                expected: Layout::Planar,
                found: Layout::Interleaved
            })
        ));
    }
}
