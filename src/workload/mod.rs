//! Synthetic workload kernels
//!
//! Named arithmetic kernels that burn CPU time proportional to a requested
//! element count and return a deterministic operation count. Workers own
//! private, randomly generated input buffers; a kernel pass reduces them to a
//! black-boxed accumulator so the work cannot be optimized away.

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{AccelBenchError, Result};

/// Number of input vectors summed by the `vector_sum` kernel
const VECTOR_SUM_INPUTS: usize = 8;

/// Named workload kernel variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Fused multiply-add over three i16 vectors (2 ops per element)
    MultiplyAdd,
    /// Elementwise sum of eight i32 vectors (7 ops per element)
    VectorSum,
    /// XOR/AND/OR combination of two u16 vectors (3 ops per element)
    BitwiseOps,
}

impl WorkloadKind {
    /// All kernel variants, in report order
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::MultiplyAdd,
        WorkloadKind::VectorSum,
        WorkloadKind::BitwiseOps,
    ];

    /// Canonical name used in configuration and reports
    pub fn name(&self) -> &'static str {
        match self {
            WorkloadKind::MultiplyAdd => "multiply_add",
            WorkloadKind::VectorSum => "vector_sum",
            WorkloadKind::BitwiseOps => "bitwise_ops",
        }
    }

    /// Arithmetic operations counted per element per pass
    pub fn ops_per_element(&self) -> u64 {
        match self {
            WorkloadKind::MultiplyAdd => 2, // multiply + add
            WorkloadKind::VectorSum => 7,   // 7 additions across 8 inputs
            WorkloadKind::BitwiseOps => 3,  // XOR + AND + OR
        }
    }

    /// Generate the private input buffers for one worker.
    ///
    /// Buffer contents are random; the operation count of a pass depends only
    /// on `element_count` and the kind, never on the data.
    pub fn generate(&self, element_count: usize) -> Result<WorkloadBuffers> {
        if element_count == 0 {
            return Err(AccelBenchError::ConfigError(
                "Workload element count must be greater than 0".to_string(),
            ));
        }

        let mut rng = SmallRng::from_entropy();
        match self {
            WorkloadKind::MultiplyAdd => Ok(WorkloadBuffers::MultiplyAdd {
                a: random_vec(&mut rng, element_count, 0i16..255)?,
                b: random_vec(&mut rng, element_count, 0i16..255)?,
                c: random_vec(&mut rng, element_count, 0i16..255)?,
            }),
            WorkloadKind::VectorSum => {
                let mut vectors = Vec::with_capacity(VECTOR_SUM_INPUTS);
                for _ in 0..VECTOR_SUM_INPUTS {
                    vectors.push(random_vec(&mut rng, element_count, 0i32..255)?);
                }
                Ok(WorkloadBuffers::VectorSum { vectors })
            }
            WorkloadKind::BitwiseOps => Ok(WorkloadBuffers::BitwiseOps {
                a: random_vec(&mut rng, element_count, 0u16..=u16::MAX)?,
                b: random_vec(&mut rng, element_count, 0u16..=u16::MAX)?,
            }),
        }
    }

    /// Execute one kernel pass over the buffers.
    ///
    /// Returns the exact operation count `element_count * ops_per_element`.
    pub fn run(&self, buffers: &WorkloadBuffers) -> u64 {
        match (self, buffers) {
            (WorkloadKind::MultiplyAdd, WorkloadBuffers::MultiplyAdd { a, b, c }) => {
                let mut acc = 0i64;
                for ((&x, &y), &z) in a.iter().zip(b.iter()).zip(c.iter()) {
                    let v = (x as i32).wrapping_mul(y as i32).wrapping_add(z as i32);
                    acc = acc.wrapping_add(v as i64);
                }
                black_box(acc);
                a.len() as u64 * self.ops_per_element()
            }
            (WorkloadKind::VectorSum, WorkloadBuffers::VectorSum { vectors }) => {
                let len = vectors.first().map(|v| v.len()).unwrap_or(0);
                let mut acc = 0i64;
                for i in 0..len {
                    let mut sum = 0i64;
                    for v in vectors {
                        sum = sum.wrapping_add(v[i] as i64);
                    }
                    acc = acc.wrapping_add(sum);
                }
                black_box(acc);
                len as u64 * self.ops_per_element()
            }
            (WorkloadKind::BitwiseOps, WorkloadBuffers::BitwiseOps { a, b }) => {
                let mut acc = 0u16;
                for (&x, &y) in a.iter().zip(b.iter()) {
                    acc ^= (x ^ y) & (x | y);
                }
                black_box(acc);
                a.len() as u64 * self.ops_per_element()
            }
            // Buffers from another kind: no elements of this kind were
            // processed, so no operations are counted.
            _ => 0,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkloadKind {
    type Err = AccelBenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "multiply_add" => Ok(WorkloadKind::MultiplyAdd),
            "vector_sum" => Ok(WorkloadKind::VectorSum),
            "bitwise_ops" => Ok(WorkloadKind::BitwiseOps),
            other => Err(AccelBenchError::ConfigError(format!(
                "Unknown workload name: {}",
                other
            ))),
        }
    }
}

/// Per-kind input buffers, exclusively owned by one worker
#[derive(Debug, Clone)]
pub enum WorkloadBuffers {
    MultiplyAdd {
        a: Vec<i16>,
        b: Vec<i16>,
        c: Vec<i16>,
    },
    VectorSum {
        vectors: Vec<Vec<i32>>,
    },
    BitwiseOps {
        a: Vec<u16>,
        b: Vec<u16>,
    },
}

impl WorkloadBuffers {
    /// Number of elements a kernel pass covers
    pub fn element_count(&self) -> usize {
        match self {
            WorkloadBuffers::MultiplyAdd { a, .. } => a.len(),
            WorkloadBuffers::VectorSum { vectors } => {
                vectors.first().map(|v| v.len()).unwrap_or(0)
            }
            WorkloadBuffers::BitwiseOps { a, .. } => a.len(),
        }
    }
}

/// Allocate and fill a random vector, surfacing allocation failure as an
/// error instead of aborting the process.
fn random_vec<T, R>(rng: &mut SmallRng, len: usize, range: R) -> Result<Vec<T>>
where
    T: rand::distributions::uniform::SampleUniform + Copy,
    R: rand::distributions::uniform::SampleRange<T> + Clone,
{
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        AccelBenchError::AllocationError(format!(
            "Failed to allocate workload buffer of {} elements: {}",
            len, e
        ))
    })?;
    for _ in 0..len {
        v.push(rng.gen_range(range.clone()));
    }
    Ok(v)
}
