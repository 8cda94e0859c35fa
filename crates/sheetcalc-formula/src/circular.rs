//! Circular-reference detection
//!
//! The call stack holds every key currently mid-evaluation: the frames
//! being run right now and, below them, the keys parked while a cell they
//! read is computed first. Entering a key that is already on it is refused
//! before any evaluation happens, and every key on the stack is flagged so
//! that each of them resolves to the circular error.

use crate::dependency::{AreaRef, EvalKey, Precedents};
use ahash::AHashSet;

/// One key being evaluated and what it has read so far
#[derive(Debug)]
pub struct Frame {
    pub key: EvalKey,
    pub precedents: Precedents,
    /// Part of a detected cycle
    pub circular: bool,
}

/// A key whose evaluation waits for one of its precedents
#[derive(Debug)]
struct Parked {
    key: EvalKey,
    circular: bool,
}

/// Outcome of trying to enter a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Entered,
    Circular,
}

/// Keys currently being evaluated, innermost last
#[derive(Debug, Default)]
pub struct CallStack {
    parked: Vec<Parked>,
    frames: Vec<Frame>,
    /// Every key in `parked` and `frames`
    active: AHashSet<EvalKey>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of running frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.parked.is_empty()
    }

    pub fn contains(&self, key: &EvalKey) -> bool {
        self.active.contains(key)
    }

    /// Key of the innermost running frame
    pub fn current(&self) -> Option<&EvalKey> {
        self.frames.last().map(|f| &f.key)
    }

    /// Push a frame unless `key` is already on the stack
    ///
    /// On a repeat, nothing is pushed and the cycle is marked instead.
    pub fn enter(&mut self, key: EvalKey) -> Entry {
        if self.active.contains(&key) {
            self.mark_cycle(&key);
            return Entry::Circular;
        }
        self.active.insert(key.clone());
        self.frames.push(Frame {
            key,
            precedents: Precedents::default(),
            circular: false,
        });
        Entry::Entered
    }

    /// Pop the innermost frame
    pub fn exit(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        self.active.remove(&frame.key);
        Some(frame)
    }

    /// Set the innermost frame aside until [`CallStack::resume`]
    ///
    /// The key stays on the stack; what it read so far is dropped because
    /// the evaluation is run again from the start.
    pub fn park(&mut self) -> Option<&EvalKey> {
        let frame = self.frames.pop()?;
        self.parked.push(Parked {
            key: frame.key,
            circular: frame.circular,
        });
        self.parked.last().map(|p| &p.key)
    }

    /// Run the most recently parked key again, keeping its cycle flag
    pub fn resume(&mut self) -> Option<&EvalKey> {
        let Parked { key, circular } = self.parked.pop()?;
        self.frames.push(Frame {
            key,
            precedents: Precedents::default(),
            circular,
        });
        self.current()
    }

    /// Drop everything, after a fault aborted evaluation
    pub fn clear(&mut self) {
        self.parked.clear();
        self.frames.clear();
        self.active.clear();
    }

    /// Record a read by the innermost frame
    pub fn record(&mut self, key: EvalKey) {
        if let Some(frame) = self.frames.last_mut() {
            frame.precedents.keys.insert(key);
        }
    }

    pub fn record_area(&mut self, area: AreaRef) {
        if let Some(frame) = self.frames.last_mut() {
            frame.precedents.areas.insert(area);
        }
    }

    /// Flag every key on the stack after `key` was met again
    pub fn mark_cycle(&mut self, key: &EvalKey) {
        if log::log_enabled!(log::Level::Warn) {
            let chain = self
                .parked
                .iter()
                .map(|p| &p.key)
                .chain(self.frames.iter().map(|f| &f.key));
            let start = chain.clone().position(|k| k == key).unwrap_or(0);
            log::warn!(
                "circular reference: {}",
                chain
                    .skip(start)
                    .chain(std::iter::once(key))
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
        }
        for parked in &mut self.parked {
            parked.circular = true;
        }
        for frame in &mut self.frames {
            frame.circular = true;
        }
    }
}
