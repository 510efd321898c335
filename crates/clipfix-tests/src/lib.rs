//! Cross-crate checks for ClipFix: engine properties under proptest and
//! end-to-end runs through the pipeline.

#[cfg(test)]
mod color;

#[cfg(test)]
mod audio;

#[cfg(test)]
mod stabilize;

#[cfg(test)]
mod pipeline;
