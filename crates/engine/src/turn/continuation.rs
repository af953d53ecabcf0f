use std::collections::VecDeque;

use super::token::StepToken;

/// A one-shot action spliced between two turns.
///
/// The scheduler resumes it with the in-flight [`StepToken`] instead of running
/// its default finish logic. Whatever the continuation starts must hand that
/// token back once it is done, which is how a multi-stage sequence rejoins the
/// normal turn flow. A continuation may defer further continuations through
/// the context it receives.
pub trait Continuation<H> {
    fn label(&self) -> &'static str {
        "continuation"
    }

    fn resume(self: Box<Self>, token: StepToken, cx: &mut StepContext<'_, H>);
}

/// Adapter for closure-backed continuations.
pub struct FnContinuation<F> {
    label: &'static str,
    run: F,
}

pub fn continuation_fn<H, F>(label: &'static str, run: F) -> FnContinuation<F>
where
    F: FnOnce(StepToken, &mut StepContext<'_, H>),
{
    FnContinuation { label, run }
}

impl<H, F> Continuation<H> for FnContinuation<F>
where
    F: FnOnce(StepToken, &mut StepContext<'_, H>),
{
    fn label(&self) -> &'static str {
        self.label
    }

    fn resume(self: Box<Self>, token: StepToken, cx: &mut StepContext<'_, H>) {
        let this = *self;
        (this.run)(token, cx);
    }
}

/// Strict FIFO of pending continuations. No priority, no cancellation, no dedup.
pub(crate) struct ContinuationQueue<H> {
    pending: VecDeque<Box<dyn Continuation<H>>>,
}

impl<H> Default for ContinuationQueue<H> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<H> ContinuationQueue<H> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push<C>(&mut self, continuation: C)
    where
        C: Continuation<H> + 'static,
    {
        self.pending.push_back(Box::new(continuation));
    }

    pub(crate) fn pop_front(&mut self) -> Option<Box<dyn Continuation<H>>> {
        self.pending.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pending.iter().map(|continuation| continuation.label())
    }

    /// Drops every pending entry without running it. Returns how many were dropped.
    pub(crate) fn abandon_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

/// What a participant or continuation can reach while the scheduler is running it.
pub struct StepContext<'a, H> {
    host: &'a mut H,
    continuations: &'a mut ContinuationQueue<H>,
}

impl<'a, H> StepContext<'a, H> {
    pub(crate) fn new(host: &'a mut H, continuations: &'a mut ContinuationQueue<H>) -> Self {
        Self {
            host,
            continuations,
        }
    }

    pub fn host(&self) -> &H {
        self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.host
    }

    pub fn defer<C>(&mut self, continuation: C)
    where
        C: Continuation<H> + 'static,
    {
        self.continuations.push(continuation);
    }

    pub fn pending_continuations(&self) -> usize {
        self.continuations.len()
    }
}
