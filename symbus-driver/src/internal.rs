/// Private interfaces for the Symbus engine
///
/// Drivers should not use this module.
/// Backward-incompatible changes can be made without major version bump.
use crate::burst::Completion;
use crate::port::EdgeTrigger;

pub trait DynamicEdgeSink {
    fn edge(&self);
    fn trigger(&self) -> EdgeTrigger;
}

pub trait DynamicCompletionSink {
    fn complete(&self, completion: &Completion);
}
