/// Receives events from a driver and optionally returns a control action.
///
/// Each driver defines its own event and action types. Closures of the form
/// `FnMut(&E) -> Option<A>` are observers, and so is `()`, which ignores every
/// event.
pub trait Observer<E, A> {
    /// Inspects an event and optionally returns an action for the driver.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
