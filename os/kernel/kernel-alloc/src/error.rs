use kernel_memory_addresses::PhysicalAddress;

/// A managed frame region could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("region bound {0} is not page aligned")]
    Misaligned(PhysicalAddress),
    #[error("region [{base}, {top}) is empty")]
    Empty {
        base: PhysicalAddress,
        top: PhysicalAddress,
    },
    #[error("reference-count table holds {actual} entries, region needs {needed}")]
    TableTooSmall { needed: usize, actual: usize },
}

/// A frame handed back to an allocator was rejected.
///
/// Any of these is a kernel bug; [`free`](crate::FrameAllocator::free) panics
/// with this error's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("kfree: {0} is not page aligned")]
    Misaligned(PhysicalAddress),
    #[error("kfree: {0} is outside the managed region")]
    OutOfRange(PhysicalAddress),
    #[error("kfree: {0} is already free")]
    DoubleFree(PhysicalAddress),
}

/// A copy-on-write fault could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CowError {
    /// No frame was available for the private copy.
    #[error("out of memory")]
    OutOfMemory,
    /// The faulting frame has no owners.
    #[error("{0} is not allocated")]
    NotAllocated(PhysicalAddress),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
