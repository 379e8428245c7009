//! Train/test partitioning of samples.

mod stratified;

pub use stratified::{stratified_split, Partition};
