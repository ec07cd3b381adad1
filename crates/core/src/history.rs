//! Bounded undo/redo over reversible commands.
//!
//! The history knows nothing about what a command does. It only guarantees
//! strict LIFO order: `undo` reverts the most recent executed command, `redo`
//! re-applies the most recent undone one, and executing anything new discards
//! the redo stack.

use std::collections::VecDeque;

/// A reversible edit applied to a target `T`.
///
/// Implementations capture whatever prior state they need at construction so
/// `undo` restores the target exactly.
pub trait Command<T> {
    type Error;

    fn execute(&mut self, target: &mut T) -> Result<(), Self::Error>;
    fn undo(&mut self, target: &mut T) -> Result<(), Self::Error>;
    fn description(&self) -> String;
}

pub type BoxedCommand<T, E> = Box<dyn Command<T, Error = E>>;

/// Undo and redo stacks with a fixed undo depth.
pub struct CommandHistory<T, E> {
    undo_stack: VecDeque<BoxedCommand<T, E>>,
    redo_stack: Vec<BoxedCommand<T, E>>,
    capacity: usize,
}

impl<T, E> CommandHistory<T, E> {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { undo_stack: VecDeque::new(), redo_stack: Vec::new(), capacity: capacity.max(1) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs `command` and records it.
    ///
    /// If `execute` fails the error is returned and nothing is recorded; the
    /// redo stack is left as it was.
    pub fn execute<C>(&mut self, mut command: C, target: &mut T) -> Result<(), E>
    where
        C: Command<T, Error = E> + 'static,
    {
        command.execute(target)?;
        self.push_undo(Box::new(command));
        self.redo_stack.clear();
        Ok(())
    }

    /// Reverts the most recent command. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// A command whose `undo` fails stays on the undo stack.
    pub fn undo(&mut self, target: &mut T) -> Result<bool, E> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = command.undo(target) {
            self.undo_stack.push_back(command);
            return Err(err);
        }
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-applies the most recently undone command. Returns `Ok(false)` when
    /// there is nothing to redo.
    pub fn redo(&mut self, target: &mut T) -> Result<bool, E> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.execute(target) {
            self.redo_stack.push(command);
            return Err(err);
        }
        self.push_undo(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Description of the command `undo` would revert.
    pub fn next_undo(&self) -> Option<String> {
        self.undo_stack.back().map(|command| command.description())
    }

    pub fn next_redo(&self) -> Option<String> {
        self.redo_stack.last().map(|command| command.description())
    }

    /// Drops both stacks without running any command.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, command: BoxedCommand<T, E>) {
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
    }
}

impl<T, E> Default for CommandHistory<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for CommandHistory<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

type Step<T, E> = Box<dyn FnMut(&mut T) -> Result<(), E>>;

/// Command assembled from a pair of closures.
pub struct FnCommand<T, E> {
    description: String,
    execute: Step<T, E>,
    undo: Step<T, E>,
}

impl<T, E> FnCommand<T, E> {
    pub fn new(
        description: impl Into<String>,
        execute: impl FnMut(&mut T) -> Result<(), E> + 'static,
        undo: impl FnMut(&mut T) -> Result<(), E> + 'static,
    ) -> Self {
        Self { description: description.into(), execute: Box::new(execute), undo: Box::new(undo) }
    }
}

impl<T, E> Command<T> for FnCommand<T, E> {
    type Error = E;

    fn execute(&mut self, target: &mut T) -> Result<(), E> {
        (self.execute)(target)
    }

    fn undo(&mut self, target: &mut T) -> Result<(), E> {
        (self.undo)(target)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
