pub mod columnar;
pub mod segment;
pub mod snapshot;
pub mod store;

pub use columnar::{SegmentHeader, SEGMENT_MAGIC};
pub use segment::{ActiveSegment, SealedSegment, VectorRecord};
pub use snapshot::{Snapshot, SnapshotLog};
pub use store::SegmentStore;
