//! Ordered asynchronous action sequences.
//!
//! A [`Sequence`] is a chain of steps executed strictly in order, one at a
//! time, on a single logical thread of control. Every database operation in
//! this crate rides on a sequence: each step may suspend on I/O, and the
//! sequence guarantees that no later step starts before the current one has
//! reached a decision.
//!
//! A step receives the value produced by the step before it and resolves to
//! a [`Control`] verdict:
//!
//! - [`Control::Advance`] - move to the next step, handing it the value;
//! - [`Control::Repeat`] - move back one position (the previous step runs
//!   again), used to drain a work queue one item per pass;
//! - [`Control::Finish`] - terminate the whole sequence successfully now,
//!   skipping any remaining steps;
//! - [`Control::Nested`] - run another sequence in place; its terminal value
//!   feeds the step after this one, its failure becomes this sequence's
//!   failure.
//!
//! Failures short-circuit: once a step returns an error, no further steps
//! run. If an error handler was registered with [`Sequence::on_error`] it
//! receives the error and may recover with a terminal value or re-raise;
//! without a handler the error propagates to whatever consumed the sequence,
//! which for a nested sequence is the parent.
//!
//! Sequences are single-use. Running consumes the sequence, and a nested
//! sequence that has already completed cannot be entered again - repeating
//! onto one is a [`SequenceError::Exhausted`] fault rather than a silent
//! re-execution.

use std::future::Future;

use futures::future::BoxFuture;

/// Faults raised by the sequencing machinery itself, as opposed to errors
/// produced by the steps it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// A step at the first position asked to repeat its predecessor.
    #[error("repeat requested at the first step of a sequence")]
    RepeatAtStart,

    /// A completed nested sequence was entered a second time.
    #[error("a nested sequence cannot be run twice")]
    Exhausted,
}

/// Verdict produced by a step.
pub enum Control<T, E> {
    /// Proceed to the next step, passing it this value.
    Advance(T),
    /// Run the previous step again, passing it this value.
    Repeat(T),
    /// Terminate the sequence successfully with this value.
    Finish(T),
    /// Run the given sequence to a terminal state; its success value feeds
    /// the next step and its failure becomes this sequence's failure.
    Nested(Sequence<T, E>),
}

type StepFn<T, E> = Box<dyn FnMut(T) -> BoxFuture<'static, Result<Control<T, E>, E>> + Send>;
type HandlerFn<T, E> = Box<dyn FnOnce(E) -> BoxFuture<'static, Result<T, E>> + Send>;

enum Step<T, E> {
    Call(StepFn<T, E>),
    // The slot is emptied when the child runs; nested sequences are
    // restartable only by reconstruction.
    Seq(Option<Sequence<T, E>>),
}

/// An ordered, single-use chain of asynchronous steps.
pub struct Sequence<T, E> {
    steps: Vec<Step<T, E>>,
    handler: Option<HandlerFn<T, E>>,
}

impl<T, E> Default for Sequence<T, E>
where
    T: Default + Send + 'static,
    E: From<SequenceError> + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Sequence<T, E>
where
    T: Default + Send + 'static,
    E: From<SequenceError> + Send + 'static,
{
    /// Creates an empty sequence. Running it yields `T::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            handler: None,
        }
    }

    /// Appends a step. The first step of a sequence receives `T::default()`.
    #[must_use]
    pub fn then<F, Fut>(mut self, mut step: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Control<T, E>, E>> + Send + 'static,
    {
        self.steps.push(Step::Call(Box::new(move |value| {
            Box::pin(step(value))
        })));
        self
    }

    /// Appends another sequence as a single step. The parent does not
    /// advance until the child reaches a terminal state.
    #[must_use]
    pub fn nest(mut self, child: Sequence<T, E>) -> Self {
        self.steps.push(Step::Seq(Some(child)));
        self
    }

    /// Registers the error handler. The handler observes the failure and
    /// either recovers with a terminal value or re-raises.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: FnOnce(E) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.handler = Some(Box::new(move |err| Box::pin(handler(err))));
        self
    }

    /// Number of steps currently in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the sequence has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the sequence to a terminal state, consuming it.
    pub fn run(self) -> BoxFuture<'static, Result<T, E>> {
        Box::pin(async move {
            let Sequence { mut steps, handler } = self;
            match Self::drive(&mut steps).await {
                Err(err) => match handler {
                    Some(recover) => recover(err).await,
                    None => Err(err),
                },
                ok => ok,
            }
        })
    }

    async fn drive(steps: &mut [Step<T, E>]) -> Result<T, E> {
        let mut value = T::default();
        let mut index = 0usize;

        while index < steps.len() {
            let verdict = match &mut steps[index] {
                Step::Call(step) => step(value).await?,
                Step::Seq(slot) => {
                    let child = slot
                        .take()
                        .ok_or_else(|| E::from(SequenceError::Exhausted))?;
                    Control::Advance(child.run().await?)
                }
            };

            match verdict {
                Control::Advance(next) => {
                    value = next;
                    index += 1;
                }
                Control::Repeat(next) => {
                    if index == 0 {
                        return Err(E::from(SequenceError::RepeatAtStart));
                    }
                    value = next;
                    index -= 1;
                }
                Control::Finish(result) => return Ok(result),
                Control::Nested(child) => {
                    value = child.run().await?;
                    index += 1;
                }
            }
        }

        Ok(value)
    }
}
