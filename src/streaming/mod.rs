//! Streaming building blocks shared by every converter stage.
//!
//! This module provides:
//! - Fixed buffer bounds
//! - Zero-allocation field tokenizing
//! - BED row formatting
//! - Line reassembly across arbitrary read boundaries
//!
//! Memory use per stage is O(C) where C is the maximum line length.

pub mod assembler;
pub mod buffers;
pub mod output;
pub mod parsing;

pub use assembler::{AssemblerStats, LineAssembler};
pub use output::BedRow;
pub use parsing::{parse_u64_fast, FieldOffsets, Fields};
