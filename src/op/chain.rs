//! Ordered composition of coordinate operations.

use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, Identity, OpRef};

/// Functional composition of operations, each consuming the previous output.
///
/// Nested chains are flattened and identities dropped at construction.
/// Execution is atomic: a failing stage aborts the whole chain.
#[derive(Clone, Debug)]
pub struct ChainedOperation {
    steps: Vec<OpRef>,
    source_dim: usize,
    target_dim: usize,
}

impl ChainedOperation {
    pub fn new(ops: Vec<OpRef>) -> Result<Self, ProjError> {
        let mut flat: Vec<OpRef> = Vec::with_capacity(ops.len());
        for op in ops {
            match op.steps() {
                Some(inner) => flat.extend(inner.iter().cloned()),
                None => flat.push(op),
            }
        }

        let (Some(first), Some(last)) = (flat.first(), flat.last()) else {
            return Err(ProjError::InvalidParameter(
                "cannot build a chain from zero operations".into(),
            ));
        };
        let source_dim = first.source_dim();
        let target_dim = last.target_dim();

        for pair in flat.windows(2) {
            if pair[0].target_dim() != pair[1].source_dim() {
                return Err(ProjError::Dimension {
                    operation: format!("chain {} -> {}", pair[0].name(), pair[1].name()),
                    expected: pair[1].source_dim(),
                    actual: pair[0].target_dim(),
                });
            }
        }

        flat.retain(|op| !op.is_identity());
        Ok(Self {
            steps: flat,
            source_dim,
            target_dim,
        })
    }

    /// Compose into the smallest equivalent operation: the single step itself
    /// when only one survives, an identity when none does.
    pub fn compose(ops: Vec<OpRef>) -> Result<OpRef, ProjError> {
        let chain = Self::new(ops)?;
        match chain.steps.len() {
            0 => Ok(Identity::op(chain.source_dim)),
            1 => Ok(chain.steps[0].clone()),
            _ => Ok(Arc::new(chain)),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl CoordinateOperation for ChainedOperation {
    fn name(&self) -> &str {
        "chain"
    }

    fn source_dim(&self) -> usize {
        self.source_dim
    }

    fn target_dim(&self) -> usize {
        self.target_dim
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.source_dim, coord)?;
        let mut current = coord.to_vec();
        for step in &self.steps {
            current = step.transform(&current)?;
        }
        Ok(current)
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        let steps = self
            .steps
            .iter()
            .rev()
            .map(|op| op.inverse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(Self {
            steps,
            source_dim: self.target_dim,
            target_dim: self.source_dim,
        }))
    }

    fn precision(&self) -> f64 {
        self.steps.iter().map(|op| op.precision()).sum()
    }

    fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    fn steps(&self) -> Option<&[OpRef]> {
        Some(&self.steps)
    }
}
