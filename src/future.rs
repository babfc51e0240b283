use std::task::Poll;

use pin_project::pin_project;

use crate::{ContextMap, context_map::ForkedContext, event::Mdc};

/// Runs futures with a forked diagnostic context.
pub trait FutureExt: Future + Sized {
    /// Installs `fork` on whichever thread polls the future, for the duration of each poll.
    ///
    /// Changes the future makes to the diagnostic context are kept with the future
    /// between polls and never leak into the polling thread.
    fn in_context(self, fork: ForkedContext<'_>) -> ContextFuture<'_, Self>;
}

impl<F> FutureExt for F
where
    F: Future,
{
    fn in_context(self, fork: ForkedContext<'_>) -> ContextFuture<'_, Self> {
        ContextFuture {
            inner: self,
            map: fork.map,
            values: fork.values,
        }
    }
}

#[pin_project]
#[derive(Debug)]
pub struct ContextFuture<'a, F> {
    #[pin]
    inner: F,
    map: &'a ContextMap,
    values: Option<Mdc>,
}

impl<F> Future for ContextFuture<'_, F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let previous = this.map.install(this.values.take());
        let result = this.inner.poll(cx);
        *this.values = this.map.install(previous);

        result
    }
}
